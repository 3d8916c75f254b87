//! Ingestion retry pacing.
//!
//! A segment that pulls from an inventory waits between attempts. Failed
//! routing backs off exponentially up to a hard ceiling; successful flow
//! retries on a short fixed interval.

use serde::{Deserialize, Serialize};

/// Delay after an attempt that found nothing to pull.
pub const IDLE_RETRY_TICKS: u32 = 3;

/// Delay after a successful insertion.
pub const ACTIVE_RETRY_TICKS: u32 = 10;

/// Upper bound on the delay after consecutive routing failures.
pub const MAX_RETRY_TICKS: u32 = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Backoff {
    pub delay: u32,
    pub retries: u32,
}

impl Backoff {
    /// Count down one tick. Returns `true` when an attempt should be made
    /// this tick, in which case the delay is re-armed to the idle interval.
    pub fn ready(&mut self) -> bool {
        if self.delay > 0 {
            self.delay -= 1;
            false
        } else {
            self.delay = IDLE_RETRY_TICKS;
            true
        }
    }

    /// Something was available but could not be routed.
    pub fn record_failure(&mut self) {
        self.retries = self.retries.saturating_add(1);
        self.delay = failure_delay(self.retries);
    }

    pub fn record_success(&mut self) {
        self.retries = 0;
        self.delay = ACTIVE_RETRY_TICKS;
    }
}

/// `min(40, round(e^retries))`.
pub fn failure_delay(retries: u32) -> u32 {
    let raw = f64::from(retries).exp().round();
    if raw >= f64::from(MAX_RETRY_TICKS) {
        MAX_RETRY_TICKS
    } else {
        raw as u32
    }
}
