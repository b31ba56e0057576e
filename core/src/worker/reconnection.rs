//! Reconnection policy for a worker's command stream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a worker re-establishes its command stream after losing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconnectionStrategy {
    /// Give up on the first disconnect.
    None,
    /// Constant delay between attempts.
    Fixed {
        delay_ms: u64,
        /// `None` retries forever
        max_attempts: Option<u32>,
    },
    /// `initial_delay_ms * multiplier^attempt`, capped at `max_delay_ms`.
    ExponentialBackoff {
        initial_delay_ms: u64,
        max_delay_ms: u64,
        multiplier: f64,
        /// `None` retries forever
        max_attempts: Option<u32>,
    },
}

impl Default for ReconnectionStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectionStrategy {
    pub fn fixed(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
            max_attempts,
        }
    }

    pub fn exponential(initial: Duration, max: Duration, multiplier: f64) -> Self {
        Self::ExponentialBackoff {
            initial_delay_ms: initial.as_millis() as u64,
            max_delay_ms: max.as_millis() as u64,
            multiplier,
            max_attempts: None,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based), or `None` once the
    /// strategy is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.is_exhausted(attempt) {
            return None;
        }
        let ms = match self {
            Self::None => return None,
            Self::Fixed { delay_ms, .. } => *delay_ms,
            Self::ExponentialBackoff {
                initial_delay_ms,
                max_delay_ms,
                multiplier,
                ..
            } => {
                let delay = (*initial_delay_ms as f64) * multiplier.powi(attempt as i32);
                (delay as u64).min(*max_delay_ms)
            }
        };
        Some(Duration::from_millis(ms))
    }

    pub fn is_exhausted(&self, attempt: u32) -> bool {
        match self {
            Self::None => true,
            Self::Fixed { max_attempts, .. } | Self::ExponentialBackoff { max_attempts, .. } => {
                max_attempts.is_some_and(|max| attempt >= max)
            }
        }
    }
}

/// Counts consecutive failed connection attempts against a strategy.
#[derive(Debug, Clone)]
pub struct Reconnector {
    strategy: ReconnectionStrategy,
    attempt: u32,
}

impl Reconnector {
    pub fn new(strategy: ReconnectionStrategy) -> Self {
        Self {
            strategy,
            attempt: 0,
        }
    }

    /// Delay before the next attempt, advancing the counter. `None` means give up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.strategy.delay_for(self.attempt)?;
        self.attempt += 1;
        Some(delay)
    }

    /// Call after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_reconnects() {
        assert_eq!(ReconnectionStrategy::None.delay_for(0), None);
        assert!(ReconnectionStrategy::None.is_exhausted(0));
    }

    #[test]
    fn test_fixed_with_limit() {
        let strategy = ReconnectionStrategy::fixed(Duration::from_millis(250), Some(2));
        assert_eq!(strategy.delay_for(0), Some(Duration::from_millis(250)));
        assert_eq!(strategy.delay_for(1), Some(Duration::from_millis(250)));
        assert_eq!(strategy.delay_for(2), None);
    }

    #[test]
    fn test_exponential_is_capped() {
        let strategy = ReconnectionStrategy::exponential(
            Duration::from_millis(100),
            Duration::from_millis(1000),
            2.0,
        );
        assert_eq!(strategy.delay_for(0), Some(Duration::from_millis(100)));
        assert_eq!(strategy.delay_for(3), Some(Duration::from_millis(800)));
        assert_eq!(strategy.delay_for(4), Some(Duration::from_millis(1000)));
        assert!(!strategy.is_exhausted(1_000));
    }

    #[test]
    fn test_reconnector_counts_and_resets() {
        let mut reconnector =
            Reconnector::new(ReconnectionStrategy::fixed(Duration::from_millis(10), Some(2)));
        assert!(reconnector.next_delay().is_some());
        assert!(reconnector.next_delay().is_some());
        assert!(reconnector.next_delay().is_none());
        assert_eq!(reconnector.attempts(), 2);

        reconnector.reset();
        assert_eq!(reconnector.attempts(), 0);
        assert!(reconnector.next_delay().is_some());
    }

    #[test]
    fn test_strategy_serde() {
        let strategy = ReconnectionStrategy::fixed(Duration::from_secs(5), Some(10));
        let json = serde_json::to_value(&strategy).unwrap();
        assert_eq!(json["kind"], "fixed");
        let parsed: ReconnectionStrategy = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, strategy);
    }
}
