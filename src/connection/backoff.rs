use std::time::Duration;

use tokio::time::Sleep;

use crate::config::ConnectionConfig;

/// Growing delay between reconnect attempts.
#[derive(Debug, Clone)]
pub struct BackoffTimer {
    current: Duration,
    min: Duration,
    max: Duration,
    factor: f64,
}

impl BackoffTimer {
    pub fn new(min: Duration, max: Duration, factor: f64) -> Self {
        let max = max.max(min);
        Self {
            current: min,
            min,
            max,
            factor: if factor.is_nan() || factor < 1.0 { 1.0 } else { factor },
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.min_backoff(), config.max_backoff(), config.backoff_factor)
    }

    /// Interval the next [`wait`](Self::wait) will sleep for.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the current interval and grow it for the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(self.factor).min(self.max);
        delay
    }

    /// Sleep for the current interval; the interval grows immediately.
    ///
    /// The returned future owns nothing borrowed, so it can be moved into the
    /// task that performs the attempt.
    pub fn wait(&mut self) -> Sleep {
        tokio::time::sleep(self.next_delay())
    }

    /// Back to the minimum after a successful handshake.
    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> BackoffTimer {
        BackoffTimer::new(Duration::from_secs(1), Duration::from_secs(8), 2.0)
    }

    #[test]
    fn test_grows_to_cap() {
        let mut backoff = timer();
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_never_decreases_without_reset() {
        let mut backoff = BackoffTimer::new(Duration::from_millis(100), Duration::from_secs(3), 1.5);
        let mut last = Duration::ZERO;
        for _ in 0..20 {
            let next = backoff.next_delay();
            assert!(next >= last);
            assert!(next <= Duration::from_secs(3));
            last = next;
        }
    }

    #[test]
    fn test_reset_returns_to_min() {
        let mut backoff = timer();
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_secs(4));
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(1));
    }

    #[test]
    fn test_bad_factor_is_clamped() {
        let mut backoff = BackoffTimer::new(Duration::from_secs(1), Duration::from_secs(8), 0.5);
        backoff.next_delay();
        assert_eq!(backoff.current(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_sleeps_current_interval() {
        let mut backoff = BackoffTimer::new(Duration::from_millis(10), Duration::from_millis(40), 2.0);
        let started = tokio::time::Instant::now();
        backoff.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert_eq!(backoff.current(), Duration::from_millis(20));
    }
}
