//! Trigger requests and persisted trigger rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Options attached to a run submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerOptions {
    /// A repeated key returns the run created by the first submission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Higher values are dispatched first among ready work.
    #[serde(default)]
    pub priority: i32,
}

/// A request to start one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRun {
    pub workflow: String,
    pub input: Value,
    #[serde(default)]
    pub options: TriggerOptions,
}

/// Scheduler's answer to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedRun {
    pub run_id: Uuid,
    /// True if the idempotency key matched an earlier submission.
    pub reused: bool,
}

/// A one-shot future trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub workflow: String,
    pub trigger_at: DateTime<Utc>,
    pub input: Value,
}

/// A recurring trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronEntry {
    pub id: Uuid,
    pub workflow: String,
    pub expression: String,
    pub input: Value,
}

/// Normalise a cron expression to the six-field form (with seconds).
///
/// Five-field expressions get a leading `0` seconds field; anything else is
/// returned trimmed and unchanged.
pub fn normalize_cron_expression(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {}", trimmed)
    } else {
        trimmed.to_string()
    }
}
