//! Durable suspension types.
//!
//! A task that sleeps or waits for an event does not hold a timer. It returns
//! a [`SuspendRequest`] to the scheduler, which records the resumption
//! condition and later invokes the task again with a [`Resumption`] carrying
//! the checkpoint the task saved. Only the continuation runs on resume.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// What the task is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suspension {
    Sleep {
        duration_ms: u64,
    },
    WaitForEvent {
        event_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl Suspension {
    pub fn sleep(duration: Duration) -> Self {
        Self::Sleep {
            duration_ms: duration.as_millis() as u64,
        }
    }

    pub fn wait_for_event(event_key: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self::WaitForEvent {
            event_key: event_key.into(),
            timeout_ms: timeout.map(|t| t.as_millis() as u64),
        }
    }
}

/// Returned by a task body instead of an output when it suspends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspendRequest {
    pub suspension: Suspension,
    /// Opaque state handed back on resumption
    pub checkpoint: Value,
    /// Number of the suspension point within this task, starting at 1
    pub step: u32,
}

/// Why a suspended task was resumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum ResumeCause {
    SleepElapsed,
    EventReceived { payload: Value },
    WaitTimedOut,
}

/// Delivered with the invocation that continues a suspended task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resumption {
    pub step: u32,
    pub checkpoint: Value,
    pub cause: ResumeCause,
}

impl Resumption {
    /// Event payload if the task resumed because its event arrived.
    pub fn event_payload(&self) -> Option<&Value> {
        match &self.cause {
            ResumeCause::EventReceived { payload } => Some(payload),
            _ => None,
        }
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.cause, ResumeCause::WaitTimedOut)
    }
}
