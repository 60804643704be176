use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters for the dispatcher and its reconstructions.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    packets_admitted: AtomicU64,
    packets_shed: AtomicU64,
    fragments_written: AtomicU64,
    fragment_write_failures: AtomicU64,
    flow_create_failures: AtomicU64,
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    reconstructions_completed: AtomicU64,
    reconstructions_failed: AtomicU64,
    events_emitted: AtomicU64,
}

/// Point-in-time copy of [`DispatcherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets_admitted: u64,
    pub packets_shed: u64,
    pub fragments_written: u64,
    pub fragment_write_failures: u64,
    pub flow_create_failures: u64,
    pub connections_opened: u64,
    pub connections_closed: u64,
    pub reconstructions_completed: u64,
    pub reconstructions_failed: u64,
    pub events_emitted: u64,
}

macro_rules! counters {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl DispatcherStats {
            $(
                pub(crate) fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    packet_admitted => packets_admitted,
    packet_shed => packets_shed,
    fragment_written => fragments_written,
    fragment_write_failed => fragment_write_failures,
    flow_create_failed => flow_create_failures,
    connection_opened => connections_opened,
    connection_closed => connections_closed,
    reconstruction_completed => reconstructions_completed,
    reconstruction_failed => reconstructions_failed,
    event_emitted => events_emitted,
}
