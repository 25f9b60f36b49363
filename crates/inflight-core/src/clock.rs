//! Monotonic frame clock.

use std::time::{Duration, Instant};

/// Produces the elapsed time written into each frame's parameters.
///
/// Samples never decrease within a run, even if the caller hands in an
/// instant that is older than a previous one.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Duration,
}

impl FrameClock {
    /// Start a clock at the current instant.
    pub fn start() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Start a clock at a given instant.
    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last: Duration::ZERO,
        }
    }

    /// Elapsed time at `now`, clamped so it never goes backwards.
    pub fn sample_at(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.start);
        self.last = self.last.max(elapsed);
        self.last
    }

    /// Elapsed seconds at `now`.
    pub fn seconds_at(&mut self, now: Instant) -> f32 {
        self.sample_at(now).as_secs_f32()
    }

    /// Elapsed seconds right now.
    pub fn seconds(&mut self) -> f32 {
        self.seconds_at(Instant::now())
    }

    /// Last sampled elapsed time.
    pub fn last(&self) -> Duration {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn samples_relative_to_start() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        assert_relative_eq!(clock.seconds_at(start + Duration::from_millis(1500)), 1.5);
    }

    #[test]
    fn never_goes_backwards() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);

        let later = clock.seconds_at(start + Duration::from_secs(2));
        let earlier = clock.seconds_at(start + Duration::from_secs(1));
        assert_relative_eq!(later, 2.0);
        assert_relative_eq!(earlier, 2.0);
    }

    #[test]
    fn instant_before_start_is_zero() {
        let start = Instant::now() + Duration::from_secs(10);
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.sample_at(Instant::now()), Duration::ZERO);
    }
}
