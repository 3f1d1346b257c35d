//! Wall-clock timing of the computation phase.

use std::time::{Duration, Instant};

/// Measures the computation phase of a run.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn stop(self) -> ElapsedTime {
        ElapsedTime(self.started.elapsed())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ElapsedTime(pub Duration);

impl ElapsedTime {
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Whole microseconds, saturating at `u64::MAX`.
    pub fn as_micros(&self) -> u64 {
        u64::try_from(self.0.as_micros()).unwrap_or(u64::MAX)
    }
}
