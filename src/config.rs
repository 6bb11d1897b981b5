use core::hint;
use std::time::{Duration, Instant};

/// Construction-time configuration shared by every set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
    /// Busy-wait performed once per operation inside its critical region, after the search and
    /// before the structural change. Zero disables it.
    ///
    /// This only widens race windows for stress testing; the duration is the same for every
    /// implementation so that contention is comparable across them.
    pub inner_work_time: Duration,
}

impl Config {
    /// Creates a configuration without inner work.
    pub const fn new() -> Self {
        Self {
            inner_work_time: Duration::ZERO,
        }
    }

    /// Sets the inner work time.
    pub const fn with_inner_work_time(mut self, inner_work_time: Duration) -> Self {
        self.inner_work_time = inner_work_time;
        self
    }

    /// Creates a configuration whose inner work time is `micros` microseconds.
    pub const fn from_micros(micros: u64) -> Self {
        Self::new().with_inner_work_time(Duration::from_micros(micros))
    }

    /// Performs the inner work.
    #[inline]
    pub(crate) fn inner_work(&self) {
        busy_wait(self.inner_work_time);
    }
}

/// Spins until `duration` has elapsed. Returns immediately for a zero duration.
pub fn busy_wait(duration: Duration) {
    if duration.is_zero() {
        return;
    }

    let end = Instant::now() + duration;
    while Instant::now() < end {
        hint::spin_loop();
    }
}
