//! Task execution results reported back to the scheduler.

use crate::durable::SuspendRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one task invocation.
///
/// This enum represents all possible outcomes of a task invocation,
/// independent of the language runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskExecutionResult {
    /// Task completed successfully with an output value
    Completed { output: Value },
    /// Task failed with an error
    Failed {
        /// Human-readable error message
        error_message: String,
        /// Machine-readable error type for categorization
        error_type: Option<String>,
        /// Whether the scheduler may retry the task
        is_retryable: bool,
    },
    /// Task was cancelled (either by user or system)
    Cancelled,
    /// Task exceeded its timeout
    TimedOut,
    /// Task asked to be resumed later
    Suspended(SuspendRequest),
}

impl TaskExecutionResult {
    /// Create a successful completion result
    pub fn completed(output: Value) -> Self {
        Self::Completed { output }
    }

    /// Create a failed result
    pub fn failed(error_message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Failed {
            error_message: error_message.into(),
            error_type: None,
            is_retryable,
        }
    }

    /// Create a failed result with an error type
    pub fn failed_with_type(
        error_message: impl Into<String>,
        error_type: impl Into<String>,
        is_retryable: bool,
    ) -> Self {
        Self::Failed {
            error_message: error_message.into(),
            error_type: Some(error_type.into()),
            is_retryable,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Check if the task can be retried
    pub fn can_retry(&self) -> bool {
        match self {
            Self::Failed { is_retryable, .. } => *is_retryable,
            Self::TimedOut => true,
            _ => false,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::Suspended(_) => "suspended",
        }
    }

    /// Error text recorded on the task when this result ends it.
    pub fn error_text(&self) -> Option<String> {
        match self {
            Self::Failed { error_message, .. } => Some(error_message.clone()),
            Self::TimedOut => Some("Task timed out".to_string()),
            _ => None,
        }
    }
}
