//! TaskExecutor - runs one task invocation under timeout and cancellation

use crate::error::KestrelError;
use crate::task::context::TaskContext;
use crate::task::registry::RegisteredTask;
use kestrel_core::TaskExecutionResult;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Task executor that handles task execution with supervision
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    /// Timeout for tasks that declare none
    default_timeout: Duration,
}

impl TaskExecutor {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Execute `task` and classify the outcome.
    ///
    /// The invocation's own timeout wins over the task's declared one, which
    /// wins over the executor default. Cancellation races the body; a body that
    /// returns an error after its token was tripped is reported as cancelled.
    pub async fn execute(
        &self,
        task: &RegisteredTask,
        ctx: Arc<dyn TaskContext>,
        cancel: CancellationToken,
        input: Value,
        invocation_timeout: Option<Duration>,
    ) -> TaskExecutionResult {
        let task_timeout = invocation_timeout
            .or(task.metadata.timeout)
            .unwrap_or(self.default_timeout);

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(task = %task.name(), "Task cancelled before completion");
                return TaskExecutionResult::Cancelled;
            }
            result = tokio::time::timeout(task_timeout, task.execute(ctx, input)) => result,
        };

        match result {
            Ok(Ok(output)) => TaskExecutionResult::Completed { output },
            Ok(Err(KestrelError::Suspended(request))) => TaskExecutionResult::Suspended(request),
            Ok(Err(e)) => {
                if cancel.is_cancelled() || matches!(e, KestrelError::TaskCancelled) {
                    return TaskExecutionResult::Cancelled;
                }
                let (error_type, is_retryable) = Self::classify_error(&e);
                TaskExecutionResult::Failed {
                    error_message: e.to_string(),
                    error_type,
                    is_retryable,
                }
            }
            Err(_) => TaskExecutionResult::TimedOut,
        }
    }

    fn classify_error(error: &KestrelError) -> (Option<String>, bool) {
        match error {
            KestrelError::NonRetryable(_) => (Some("NON_RETRYABLE".to_string()), false),
            KestrelError::Validation(_) => (Some("VALIDATION".to_string()), false),
            KestrelError::Serialization(_) => (Some("SERIALIZATION".to_string()), false),
            KestrelError::InvalidConfiguration(_) => (Some("INVALID_CONFIG".to_string()), false),
            KestrelError::NotFound { .. } => (Some("NOT_FOUND".to_string()), false),
            KestrelError::Transport(_) => (Some("TRANSPORT".to_string()), true),
            KestrelError::Io(_) => (Some("IO".to_string()), true),
            _ => (None, true),
        }
    }
}

impl Default for TaskExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
