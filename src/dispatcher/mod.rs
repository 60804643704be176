//! Packet intake: admission, fragment recording, and close handling.
//!
//! The intake loop runs on one thread and never waits for packet work.
//! Each admitted packet becomes a task on the runtime:
//!
//! ```text
//!   packet ──▶ admission ──shed──▶ dropped
//!                  │
//!                  ▼
//!             ┌─────────┐  payload  ┌──────────────────────────┐
//!             │  task   │ ────────▶ │ create flow dir (once)    │
//!             └────┬────┘           │ append fragment           │
//!                  │ FIN            └──────────────────────────┘
//!                  ▼
//!      reconstruction task
//!        1. wait for earlier writes of the flow
//!        2. unregister flow
//!        3. segment fragments ──▶ events ──▶ consumer
//!        4. delete fragments (always)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{OwnedRwLockReadGuard, RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::capture::{PacketSource, TcpPacket};
use crate::config::Config;
use crate::error::CaptureError;
use crate::flow::{ConnectionId, FlowRegistry};
use crate::http::FlowEvent;
use crate::store::{FragmentStore, SequenceToken};

pub mod admission;
pub mod reconstruct;
pub mod stats;

pub use admission::{Admission, AdmissionControl};
pub use reconstruct::ReconstructionSummary;
pub use stats::{DispatcherStats, StatsSnapshot};

use admission::InFlightGauge;

/// State shared by every packet and reconstruction task.
pub(crate) struct Shared {
    pub(crate) store: FragmentStore,
    pub(crate) registry: FlowRegistry,
    pub(crate) stats: DispatcherStats,
    pub(crate) events: mpsc::Sender<FlowEvent>,
    pub(crate) reconstructions: AtomicUsize,
}

/// Per-flow barrier between fragment writes and the close that follows them.
///
/// Writes hold a read guard taken at intake; the close waits for the write
/// guard, so it cannot list fragments while an earlier write is pending.
type WriteGate = Arc<RwLock<()>>;

pub struct Dispatcher {
    shared: Arc<Shared>,
    admission: AdmissionControl,
    gauge: InFlightGauge,
    gates: HashMap<ConnectionId, WriteGate>,
    runtime: Handle,
}

impl Dispatcher {
    pub fn new(cfg: &Config, events: mpsc::Sender<FlowEvent>, runtime: Handle) -> Self {
        let admission = AdmissionControl::new(cfg.max_in_flight, cfg.shed_cooldown());
        let gauge = admission.gauge();

        Self {
            shared: Arc::new(Shared {
                store: FragmentStore::new(&cfg.storage_root),
                registry: FlowRegistry::new(),
                stats: DispatcherStats::default(),
                events,
                reconstructions: AtomicUsize::new(0),
            }),
            admission,
            gauge,
            gates: HashMap::new(),
            runtime,
        }
    }

    /// Drives `source` until it is exhausted. A capture error ends intake.
    pub fn run<P: PacketSource>(&mut self, source: &mut P) -> Result<(), CaptureError> {
        while let Some(packet) = source.next_packet()? {
            self.on_packet(packet);
        }
        tracing::info!("Packet source exhausted");
        Ok(())
    }

    /// Admits and dispatches one packet. Returns the spawned unit, or `None`
    /// if the packet was ignored or shed.
    pub fn on_packet(&mut self, packet: TcpPacket) -> Option<JoinHandle<()>> {
        if !packet.is_significant() {
            return None;
        }

        let permit = match self.admission.try_admit() {
            Admission::Admitted(permit) => permit,
            Admission::Shed => {
                self.shared.stats.packet_shed();
                return None;
            }
        };
        self.shared.stats.packet_admitted();

        let id = packet.connection_id();
        let shared = Arc::clone(&self.shared);

        let handle = if packet.fin {
            let gate = self.gates.remove(&id);
            self.runtime.spawn(async move {
                let _permit = permit;
                handle_close(shared, id, packet, gate).await;
            })
        } else {
            let guard = self
                .gates
                .entry(id)
                .or_default()
                .clone()
                .try_read_owned()
                .ok();
            self.runtime.spawn(async move {
                let _permit = permit;
                let _guard: Option<OwnedRwLockReadGuard<()>> = guard;
                record_fragment(&shared, id, SequenceToken(packet.seq), &packet.payload).await;
            })
        };
        Some(handle)
    }

    /// Waits until no packet unit or reconstruction is running.
    pub async fn drain(&self) {
        while self.gauge.in_flight() > 0 || self.shared.reconstructions.load(Ordering::Acquire) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.shared.registry
    }

    pub fn store(&self) -> &FragmentStore {
        &self.shared.store
    }

    pub fn in_flight(&self) -> usize {
        self.gauge.in_flight()
    }

    pub fn is_shedding(&self) -> bool {
        self.admission.is_shedding()
    }
}

/// Stores one payload, creating the flow's directory and registry entry the
/// first time the flow is seen.
async fn record_fragment(shared: &Shared, id: ConnectionId, token: SequenceToken, payload: &Bytes) {
    if !shared.registry.contains(&id) {
        if let Err(e) = shared.store.create(&id).await {
            shared.stats.flow_create_failed();
            tracing::error!(flow = %id, error = %e, "Could not prepare flow storage");
            return;
        }
        if shared.registry.register(id) {
            shared.stats.connection_opened();
            tracing::info!(flow = %id, "Connection opened");
        }
    }

    match shared.store.append(&id, token, payload).await {
        Ok(()) => shared.stats.fragment_written(),
        Err(e) => {
            shared.stats.fragment_write_failed();
            tracing::error!(flow = %id, token = %token, error = %e, "Fragment lost");
        }
    }
}

async fn handle_close(shared: Arc<Shared>, id: ConnectionId, packet: TcpPacket, gate: Option<WriteGate>) {
    shared.stats.connection_closed();
    tracing::info!(flow = %id, seq = packet.seq, "FIN seen, scheduling reconstruction");

    shared.reconstructions.fetch_add(1, Ordering::AcqRel);
    tokio::spawn(reconstruct::run(shared, id, packet, gate));
}
