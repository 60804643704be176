//! Bounded admission of packet-processing units, with load shedding.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Result of offering one packet to the controller.
#[derive(Debug)]
pub enum Admission {
    /// The unit may run. Dropping the permit frees its slot.
    Admitted(OwnedSemaphorePermit),
    /// The packet must be dropped unprocessed.
    Shed,
}

/// Caps the number of in-flight units at `capacity`.
///
/// When an admission finds every slot taken, the controller sheds all
/// packets for `cooldown`, measured from that moment. It does not queue.
#[derive(Debug)]
pub struct AdmissionControl {
    permits: Arc<Semaphore>,
    capacity: usize,
    cooldown: Duration,
    shedding_until: Option<Instant>,
    dropped_in_window: u64,
}

impl AdmissionControl {
    pub fn new(capacity: usize, cooldown: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            cooldown,
            shedding_until: None,
            dropped_in_window: 0,
        }
    }

    pub fn try_admit(&mut self) -> Admission {
        self.try_admit_at(Instant::now())
    }

    pub fn try_admit_at(&mut self, now: Instant) -> Admission {
        if let Some(until) = self.shedding_until {
            if now < until {
                self.dropped_in_window += 1;
                return Admission::Shed;
            }
            tracing::info!(
                dropped = self.dropped_in_window,
                in_flight = self.in_flight(),
                "Resuming traffic inspection"
            );
            self.shedding_until = None;
            self.dropped_in_window = 0;
        }

        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Admission::Admitted(permit),
            Err(_) => {
                self.shedding_until = Some(now + self.cooldown);
                self.dropped_in_window = 1;
                tracing::warn!(
                    capacity = self.capacity,
                    cooldown_secs = self.cooldown.as_secs_f64(),
                    resume_at = ?(SystemTime::now() + self.cooldown),
                    "Reached in-flight limit, ignoring traffic"
                );
                Admission::Shed
            }
        }
    }

    /// Units currently admitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_shedding(&self) -> bool {
        self.shedding_until.is_some()
    }

    /// Handle for observing the live count from elsewhere.
    pub(crate) fn gauge(&self) -> InFlightGauge {
        InFlightGauge {
            permits: Arc::clone(&self.permits),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct InFlightGauge {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl InFlightGauge {
    pub(crate) fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }
}
