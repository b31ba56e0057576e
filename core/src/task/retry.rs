//! Task retry policy and backoff math.
//!
//! The scheduler enforces retries for task bodies; these helpers are shared by
//! the scheduler simulation and by anything that needs to predict its delays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay between attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// `initial_ms * multiplier^(attempt - 1)`, capped at `max_ms`.
    Exponential {
        initial_ms: u64,
        multiplier: f64,
        max_ms: u64,
    },
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn exponential(initial: Duration, multiplier: f64, max: Duration) -> Self {
        Self::Exponential {
            initial_ms: initial.as_millis() as u64,
            multiplier,
            max_ms: max.as_millis() as u64,
        }
    }
}

/// Retry policy declared on a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. `1` means no retries.
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Up to `max_attempts` attempts with exponential backoff from one second to a minute.
    pub fn exponential(max_attempts: u32) -> Self {
        Self::new(
            max_attempts,
            Backoff::exponential(Duration::from_secs(1), 2.0, Duration::from_secs(60)),
        )
    }
}

/// Calculate the delay before retrying after `attempt` failed.
///
/// # Arguments
/// * `policy` - The retry policy
/// * `attempt` - The attempt that just failed (1-based)
pub fn calculate_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    match &policy.backoff {
        Backoff::None => Duration::ZERO,
        Backoff::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
        Backoff::Exponential {
            initial_ms,
            multiplier,
            max_ms,
        } => {
            let factor = multiplier.powi(attempt.saturating_sub(1) as i32);
            let backoff_ms = (*initial_ms as f64) * factor;
            Duration::from_millis((backoff_ms as u64).min(*max_ms))
        }
    }
}

/// Check if a task should be retried after `attempt` failed.
pub fn should_retry(policy: &RetryPolicy, attempt: u32, is_retryable: bool) -> bool {
    is_retryable && attempt < policy.max_attempts
}
