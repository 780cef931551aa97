//! Time sources for the frame driver.

use std::time::Instant;

/// Reports how much time has passed since it was last asked.
pub trait Clock {
    /// Seconds elapsed since the previous call (or since creation, on the
    /// first call).
    fn elapsed_since_last(&mut self) -> f64;
}

/// Wall-clock time from [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    last: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn elapsed_since_last(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).as_secs_f64();
        self.last = now;
        elapsed
    }
}

/// Deterministic clock for tests and replays.
///
/// Each read returns the fixed per-read step plus whatever was
/// [`advance`](ManualClock::advance)d since the previous read.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    per_read: f64,
    pending: f64,
}

impl ManualClock {
    /// A clock that only moves when advanced.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that moves `seconds` on every read.
    #[must_use]
    pub fn with_step(seconds: f64) -> Self {
        Self {
            per_read: seconds,
            pending: 0.0,
        }
    }

    /// Add `seconds` to the next reading.
    pub fn advance(&mut self, seconds: f64) {
        self.pending += seconds;
    }
}

impl Clock for ManualClock {
    fn elapsed_since_last(&mut self) -> f64 {
        self.per_read + std::mem::take(&mut self.pending)
    }
}
