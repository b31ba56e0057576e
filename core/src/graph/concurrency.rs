//! Concurrency group declarations.
//!
//! The client only declares groups. Lane counters and rate windows are owned
//! by the scheduler, which derives the group key from each run's input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// How the group key is derived from a run's input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "from", content = "value", rename_all = "snake_case")]
pub enum KeyExpression {
    /// Every run shares one key.
    Static(String),
    /// JSON pointer into the run input.
    InputField(String),
}

impl KeyExpression {
    /// Derive the key for an input.
    ///
    /// String values are used verbatim, other values by their JSON text.
    /// A pointer that resolves to nothing yields an empty key.
    pub fn derive(&self, input: &Value) -> String {
        match self {
            Self::Static(key) => key.clone(),
            Self::InputField(pointer) => match input.pointer(pointer) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }
    }
}

/// Admission strategy applied to runs sharing a derived key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ConcurrencyStrategy {
    /// Runs are spread over `buckets` lanes, one active run per lane.
    RoundRobin { buckets: u32 },
    /// At most `max` active runs, or at most `max` admissions per window.
    RateLimit {
        max: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_ms: Option<u64>,
    },
    /// A new run cancels the oldest active run once `max_runs` are active.
    CancelInProgress { max_runs: u32 },
    /// A new run cancels the newest active run once `max_runs` are active.
    CancelNewest { max_runs: u32 },
}

/// A key-extraction function plus its admission strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyGroup {
    pub key: KeyExpression,
    #[serde(flatten)]
    pub strategy: ConcurrencyStrategy,
}

impl ConcurrencyGroup {
    pub fn new(key: KeyExpression, strategy: ConcurrencyStrategy) -> Self {
        Self { key, strategy }
    }

    pub fn round_robin(key: KeyExpression, buckets: u32) -> Self {
        Self::new(key, ConcurrencyStrategy::RoundRobin { buckets })
    }

    pub fn rate_limit(key: KeyExpression, max: u32) -> Self {
        Self::new(
            key,
            ConcurrencyStrategy::RateLimit {
                max,
                window_ms: None,
            },
        )
    }

    pub fn rate_limit_per_window(key: KeyExpression, max: u32, window: Duration) -> Self {
        Self::new(
            key,
            ConcurrencyStrategy::RateLimit {
                max,
                window_ms: Some(window.as_millis() as u64),
            },
        )
    }

    pub fn cancel_in_progress(key: KeyExpression, max_runs: u32) -> Self {
        Self::new(key, ConcurrencyStrategy::CancelInProgress { max_runs })
    }

    pub fn cancel_newest(key: KeyExpression, max_runs: u32) -> Self {
        Self::new(key, ConcurrencyStrategy::CancelNewest { max_runs })
    }

    /// Reject zero limits, zero windows and malformed key pointers.
    pub fn validate(&self) -> Result<(), String> {
        if let KeyExpression::InputField(pointer) = &self.key {
            if !pointer.starts_with('/') {
                return Err(format!("key pointer '{}' must start with '/'", pointer));
            }
        }
        let limit = match self.strategy {
            ConcurrencyStrategy::RoundRobin { buckets } => buckets,
            ConcurrencyStrategy::RateLimit { max, window_ms } => {
                if window_ms == Some(0) {
                    return Err("rate-limit window must be positive".to_string());
                }
                max
            }
            ConcurrencyStrategy::CancelInProgress { max_runs }
            | ConcurrencyStrategy::CancelNewest { max_runs } => max_runs,
        };
        if limit == 0 {
            return Err(format!("{:?} needs a positive limit", self.strategy));
        }
        Ok(())
    }
}

/// Lane assigned to the `sequence`-th submission of a key under `round-robin(buckets)`.
pub fn lane_for(sequence: u64, buckets: u32) -> u32 {
    (sequence % u64::from(buckets.max(1))) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_derive_key() {
        let input = json!({"tenant": "acme", "shard": 3});

        assert_eq!(KeyExpression::Static("all".into()).derive(&input), "all");
        assert_eq!(
            KeyExpression::InputField("/tenant".into()).derive(&input),
            "acme"
        );
        assert_eq!(KeyExpression::InputField("/shard".into()).derive(&input), "3");
        assert_eq!(KeyExpression::InputField("/missing".into()).derive(&input), "");
    }

    #[test]
    fn test_lane_for_is_sequence_mod_buckets() {
        let lanes: Vec<u32> = (0..7).map(|i| lane_for(i, 3)).collect();
        assert_eq!(lanes, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_group_serde_is_flat() {
        let group = ConcurrencyGroup::rate_limit_per_window(
            KeyExpression::InputField("/user".into()),
            5,
            Duration::from_secs(60),
        );
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(
            json,
            json!({
                "key": {"from": "input_field", "value": "/user"},
                "strategy": "rate_limit",
                "max": 5,
                "window_ms": 60000
            })
        );
        let parsed: ConcurrencyGroup = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, group);
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let key = KeyExpression::Static("k".into());
        assert!(ConcurrencyGroup::round_robin(key.clone(), 0).validate().is_err());
        assert!(ConcurrencyGroup::cancel_newest(key.clone(), 0).validate().is_err());
        assert!(ConcurrencyGroup::round_robin(key, 4).validate().is_ok());
        assert!(
            ConcurrencyGroup::rate_limit(KeyExpression::InputField("user".into()), 1)
                .validate()
                .is_err()
        );
    }
}
