//! TaskContext trait definition

use crate::error::{KestrelError, Result};
use async_trait::async_trait;
use kestrel_core::{ChunkContent, Resumption, SuspendRequest, Suspension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;
use uuid::Uuid;

/// Context for one task invocation: identity, parent outputs, durable
/// resumption state, cancellation and streaming.
#[async_trait]
pub trait TaskContext: Send + Sync {
    /// Unique ID of this invocation
    fn invocation_id(&self) -> Uuid;

    /// Run this invocation belongs to
    fn run_id(&self) -> Uuid;

    fn task_name(&self) -> &str;

    /// Current attempt number (1-indexed)
    fn attempt(&self) -> u32;

    /// Metadata attached to the run at submission
    fn metadata(&self) -> &HashMap<String, String>;

    /// Raw output of a succeeded parent task
    fn parent_output_value(&self, task: &str) -> Option<&Value>;

    /// Set when this invocation resumes a durable suspension
    fn resumption(&self) -> Option<&Resumption>;

    /// Check if the invocation has been cancelled
    fn is_cancelled(&self) -> bool;

    /// Return [`KestrelError::TaskCancelled`] if cancelled
    async fn check_cancellation(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(KestrelError::TaskCancelled)
        } else {
            Ok(())
        }
    }

    /// Publish a chunk to the run's stream subscribers.
    ///
    /// Chunks are ephemeral. Delivery failures are logged, not returned.
    async fn stream(&self, content: ChunkContent) -> Result<()>;

    async fn stream_text(&self, text: &str) -> Result<()> {
        self.stream(ChunkContent::text(text)).await
    }

    /// Progress values are clamped to 0.0-1.0 on the wire.
    async fn stream_progress(&self, progress: f64, details: Option<&str>) -> Result<()> {
        self.stream(ChunkContent::progress(progress, details)).await
    }

    async fn stream_data(&self, data: Value) -> Result<()> {
        self.stream(ChunkContent::data(data)).await
    }

    /// Notify subscribers of a recoverable error. For fatal errors, fail the task.
    async fn stream_error(&self, message: &str, code: Option<&str>) -> Result<()> {
        self.stream(ChunkContent::error(message, code)).await
    }
}

/// Typed helpers over [`TaskContext`].
pub trait TaskContextExt: TaskContext {
    /// Deserialize a succeeded parent's output.
    fn parent_output<T: DeserializeOwned>(&self, task: &str) -> Result<T> {
        let value = self
            .parent_output_value(task)
            .ok_or_else(|| KestrelError::not_found("Parent output", task))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Number of suspensions this task has already resumed from.
    fn step(&self) -> u32 {
        self.resumption().map(|r| r.step).unwrap_or(0)
    }

    /// Checkpoint saved by the last suspension, if resuming.
    fn checkpoint<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.resumption() {
            Some(resumption) => Ok(Some(serde_json::from_value(
                resumption.checkpoint.clone(),
            )?)),
            None => Ok(None),
        }
    }

    /// Suspend for `duration`. The scheduler holds the timer and re-invokes the
    /// task with `checkpoint` in [`TaskContext::resumption`].
    ///
    /// ```rust,ignore
    /// if ctx.resumption().is_none() {
    ///     send_reminder(&input).await?;
    ///     ctx.sleep_for(Duration::from_secs(3600), &json!({"reminded": true}))?;
    /// }
    /// ```
    fn sleep_for<C: Serialize>(&self, duration: Duration, checkpoint: &C) -> Result<Infallible> {
        self.suspend(Suspension::sleep(duration), checkpoint)
    }

    /// Suspend until `event_key` is pushed, or until `timeout` elapses.
    /// Only events pushed after the suspension count.
    fn wait_for_event<C: Serialize>(
        &self,
        event_key: &str,
        timeout: Option<Duration>,
        checkpoint: &C,
    ) -> Result<Infallible> {
        self.suspend(Suspension::wait_for_event(event_key, timeout), checkpoint)
    }

    #[doc(hidden)]
    fn suspend<C: Serialize>(&self, suspension: Suspension, checkpoint: &C) -> Result<Infallible> {
        Err(KestrelError::Suspended(SuspendRequest {
            suspension,
            checkpoint: serde_json::to_value(checkpoint)?,
            step: self.step() + 1,
        }))
    }
}

impl<T: TaskContext + ?Sized> TaskContextExt for T {}
