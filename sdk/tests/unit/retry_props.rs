//! Property-based tests for retry policies

use kestrel_core::task::{calculate_backoff, should_retry};
use kestrel_core::{Backoff, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;

proptest! {
    #[test]
    fn test_exponential_backoff_is_capped_and_monotonic(
        initial_ms in 1u64..5_000,
        multiplier in 1.0f64..4.0,
        max_ms in 1u64..600_000,
        attempts in 1u32..20,
    ) {
        let policy = RetryPolicy::new(
            attempts,
            Backoff::exponential(
                Duration::from_millis(initial_ms),
                multiplier,
                Duration::from_millis(max_ms),
            ),
        );
        let mut previous = Duration::ZERO;
        for attempt in 1..=attempts {
            let delay = calculate_backoff(&policy, attempt);
            prop_assert!(delay <= Duration::from_millis(max_ms));
            prop_assert!(delay >= previous, "attempt {} shrank: {:?} < {:?}", attempt, delay, previous);
            previous = delay;
        }
    }

    #[test]
    fn test_retries_stop_at_max_attempts(max in 1u32..10, attempt in 1u32..20, retryable: bool) {
        let policy = RetryPolicy::new(max, Backoff::None);
        prop_assert_eq!(should_retry(&policy, attempt, retryable), retryable && attempt < max);
        prop_assert!(!should_retry(&policy, max, true));
    }
}
