//! Delays of the self-engagement loop.
//!
//! Pacing only affects how a run feels to a human watching it, never what it
//! produces. Tests substitute [`NoPacing`].

use rand::Rng;
use std::time::Duration;

/// Supplies the waits used by the orchestrator.
pub trait PacingPolicy: Send + Sync {
    /// Pause after each persona turn of an autonomous run.
    fn turn_delay(&self) -> Duration;

    /// Pause before a triggered run starts.
    fn start_delay(&self) -> Duration;
}

/// Uniformly random turn delay between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomPacing {
    min: Duration,
    max: Duration,
    start: Duration,
}

impl RandomPacing {
    /// Creates a pacing policy; `min` and `max` are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration, start: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max, start }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64, start_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(min_ms),
            Duration::from_millis(max_ms),
            Duration::from_millis(start_ms),
        )
    }
}

impl Default for RandomPacing {
    fn default() -> Self {
        Self::from_millis(1000, 3000, 500)
    }
}

impl PacingPolicy for RandomPacing {
    fn turn_delay(&self) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        if min_ms == max_ms {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    fn start_delay(&self) -> Duration {
        self.start
    }
}

/// No waiting at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPacing;

impl PacingPolicy for NoPacing {
    fn turn_delay(&self) -> Duration {
        Duration::ZERO
    }

    fn start_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Sleeps for `delay`, skipping the timer entirely for a zero delay.
pub(crate) async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay_stays_in_range() {
        let pacing = RandomPacing::from_millis(1000, 3000, 500);
        for _ in 0..200 {
            let delay = pacing.turn_delay();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
        assert_eq!(pacing.start_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_inverted_bounds_are_swapped() {
        let pacing = RandomPacing::from_millis(300, 100, 0);
        let delay = pacing.turn_delay();
        assert!(delay >= Duration::from_millis(100) && delay <= Duration::from_millis(300));
    }

    #[test]
    fn test_fixed_delay() {
        let pacing = RandomPacing::from_millis(250, 250, 0);
        assert_eq!(pacing.turn_delay(), Duration::from_millis(250));
        assert_eq!(NoPacing.turn_delay(), Duration::ZERO);
    }
}
