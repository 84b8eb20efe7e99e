//! Monotonic clock and the single retransmission timer each ARQ sender owns.
//!
//! Production code reads time from `quanta::Instant`, matching the teacher's own
//! `TimestampClock` epoch wrapper. Tests can substitute any `Clock` impl; nothing
//! in `arq` depends on wall time directly.

use quanta::Instant;
use std::time::Duration;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Real wall-clock time, backed by `quanta`'s TSC-calibrated clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// The one retransmission timer a Stop-and-Wait or Go-Back-N sender owns.
///
/// `spec.md` S4.7: "a single timer per sender state machine, not per frame."
#[derive(Debug, Default, Clone, Copy)]
pub struct RetransmitTimer {
    deadline: Option<Instant>,
}

impl RetransmitTimer {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    pub fn arm(&mut self, clock: &dyn Clock, duration: Duration) {
        self.deadline = Some(clock.now() + duration);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn expired(&self, clock: &dyn Clock) -> bool {
        self.deadline.is_some_and(|d| clock.now() >= d)
    }

    /// Time remaining until expiry, or `Duration::ZERO` if already expired or unarmed.
    pub fn remaining(&self, clock: &dyn Clock) -> Duration {
        match self.deadline {
            None => Duration::ZERO,
            Some(d) => {
                let now = clock.now();
                if now >= d {
                    Duration::ZERO
                } else {
                    d - now
                }
            }
        }
    }
}
