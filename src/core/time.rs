//! Tick timing utilities

/// Fixed-cadence timer fed by per-tick deltas.
///
/// Accumulates simulated time and reports when the interval has elapsed.
/// At most one firing is reported per tick; leftover time beyond one
/// interval is dropped so a long stall does not cause a burst of passes.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: f32,
    accumulated: f32,
}

impl IntervalTimer {
    /// Create a timer firing every `interval` time units
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
        }
    }

    /// Advance by `dt`. Returns true when the interval has elapsed.
    pub fn tick(&mut self, dt: f32) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.accumulated += dt;
        }

        if self.accumulated >= self.interval {
            let remainder = self.accumulated - self.interval;
            self.accumulated = if remainder < self.interval { remainder } else { 0.0 };
            true
        } else {
            false
        }
    }

    /// Restart the current interval from zero
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }

    /// Interval length in time units
    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Time accumulated towards the next firing
    pub fn accumulated(&self) -> f32 {
        self.accumulated
    }
}
