//! Reconnect backoff
//!
//! The delay starts at `base`, doubles after each consecutive failed dial and
//! is capped at `max`. Any successful dial resets it to `base`.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Exponential backoff state for one connection
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let max = config.max.max(config.base);
        Self {
            base: config.base,
            max,
            current: config.base,
        }
    }

    /// Delay to wait after the current failure; advances the state
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Delay the next failure would wait, without advancing
    pub fn peek(&self) -> Duration {
        self.current
    }

    /// Back to the base delay after a successful dial
    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_capped() {
        let mut backoff = Backoff::default();
        let delays: Vec<_> = (0..7).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_reset_after_success() {
        let mut backoff = Backoff::default();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_two_failures_double() {
        let mut backoff = Backoff::new(BackoffConfig {
            base: Duration::from_millis(100),
            max: Duration::from_millis(150),
        });
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.peek(), Duration::from_millis(150));
        assert_eq!(backoff.next_delay(), Duration::from_millis(150));
    }

    #[test]
    fn test_max_below_base_is_raised() {
        let mut backoff = Backoff::new(BackoffConfig {
            base: Duration::from_secs(5),
            max: Duration::from_secs(1),
        });
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }
}
