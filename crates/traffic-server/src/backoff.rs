//! Exponential retry delay for the log sink.
//!
//! A failing sink doubles its wait after every failure up to a ceiling, with
//! up to 20% random jitter on top. A success returns to the base delay.

use std::time::{Duration, Instant};

use rand::Rng;

const JITTER_RATIO: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    ceiling: Duration,
    delay: Duration,
    retry_at: Option<Instant>,
}

impl Backoff {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        let base = base.max(Duration::from_millis(1));
        Self {
            base,
            ceiling: ceiling.max(base),
            delay: base,
            retry_at: None,
        }
    }

    /// True when no failure is pending or its delay has elapsed.
    pub fn ready(&self) -> bool {
        self.retry_at.map_or(true, |at| Instant::now() >= at)
    }

    pub fn reset(&mut self) {
        self.delay = self.base;
        self.retry_at = None;
    }

    /// Record a failure and return the wait before the next attempt.
    pub fn fail(&mut self) -> Duration {
        self.delay = self.delay.saturating_mul(2).min(self.ceiling);
        let wait = self.delay + jitter(self.delay);
        self.retry_at = Some(Instant::now() + wait);
        wait
    }
}

fn jitter(delay: Duration) -> Duration {
    let max_ms = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_backoff_is_ready() {
        assert!(Backoff::new(Duration::from_millis(10), Duration::from_secs(1)).ready());
    }

    #[test]
    fn failure_blocks_until_reset() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(5));
        let wait = backoff.fail();
        assert!(wait >= Duration::from_millis(200));
        assert!(wait <= Duration::from_millis(240));
        assert!(!backoff.ready());

        backoff.reset();
        assert!(backoff.ready());
    }

    #[test]
    fn delay_stops_growing_at_ceiling() {
        let mut backoff = Backoff::new(Duration::from_millis(10), Duration::from_millis(30));
        for _ in 0..6 {
            backoff.fail();
        }
        let wait = backoff.fail();
        assert!(wait >= Duration::from_millis(30));
        assert!(wait <= Duration::from_millis(36));
    }
}
