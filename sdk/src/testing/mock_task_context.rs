//! Mock task context for unit testing task bodies in isolation.

use crate::error::Result;
use crate::task::context::TaskContext;
use async_trait::async_trait;
use kestrel_core::{ChunkContent, ResumeCause, Resumption};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Mock implementation of [`TaskContext`].
///
/// Records every streamed chunk, lets a test preload parent outputs and a
/// resumption, and can simulate cancellation.
///
/// # Example
///
/// ```ignore
/// use kestrel_sdk::testing::MockTaskContext;
/// use serde_json::json;
///
/// let ctx = MockTaskContext::builder()
///     .task_name("summarize")
///     .parent_output("fetch", json!({"body": "..."}))
///     .build();
///
/// let output = summarize(&ctx, input).await?;
/// assert_eq!(ctx.text_chunks().concat(), "a short summary");
/// ```
#[derive(Clone)]
pub struct MockTaskContext {
    inner: Arc<MockTaskContextInner>,
}

struct MockTaskContextInner {
    invocation_id: Uuid,
    run_id: Uuid,
    task_name: String,
    attempt: u32,
    metadata: HashMap<String, String>,
    parent_outputs: HashMap<String, Value>,
    resumption: Option<Resumption>,
    cancelled: AtomicBool,
    chunks: RwLock<Vec<ChunkContent>>,
}

impl MockTaskContext {
    pub fn builder() -> MockTaskContextBuilder {
        MockTaskContextBuilder::default()
    }

    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Every chunk streamed so far, in order.
    pub fn chunks(&self) -> Vec<ChunkContent> {
        self.inner.chunks.read().clone()
    }

    /// Text of the text chunks, in order.
    pub fn text_chunks(&self) -> Vec<String> {
        self.inner
            .chunks
            .read()
            .iter()
            .filter_map(|c| c.as_text().map(str::to_string))
            .collect()
    }

    /// Last progress value streamed, unclamped.
    pub fn last_progress(&self) -> Option<f64> {
        self.inner.chunks.read().iter().rev().find_map(|c| match c {
            ChunkContent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn clear_chunks(&self) {
        self.inner.chunks.write().clear();
    }
}

impl Default for MockTaskContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTaskContext")
            .field("task_name", &self.inner.task_name)
            .field("attempt", &self.inner.attempt)
            .field("chunks", &self.inner.chunks.read().len())
            .finish()
    }
}

/// Builder for [`MockTaskContext`].
#[derive(Default)]
pub struct MockTaskContextBuilder {
    invocation_id: Option<Uuid>,
    run_id: Option<Uuid>,
    task_name: Option<String>,
    attempt: Option<u32>,
    metadata: HashMap<String, String>,
    parent_outputs: HashMap<String, Value>,
    resumption: Option<Resumption>,
    cancelled: bool,
}

impl MockTaskContextBuilder {
    pub fn invocation_id(mut self, id: Uuid) -> Self {
        self.invocation_id = Some(id);
        self
    }

    pub fn run_id(mut self, id: Uuid) -> Self {
        self.run_id = Some(id);
        self
    }

    pub fn task_name(mut self, name: impl Into<String>) -> Self {
        self.task_name = Some(name.into());
        self
    }

    pub fn attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn parent_output(mut self, task: impl Into<String>, output: Value) -> Self {
        self.parent_outputs.insert(task.into(), output);
        self
    }

    /// Resume as if the `step`-th suspension ended with `cause`.
    pub fn resuming(mut self, step: u32, checkpoint: Value, cause: ResumeCause) -> Self {
        self.resumption = Some(Resumption {
            step,
            checkpoint,
            cause,
        });
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    pub fn build(self) -> MockTaskContext {
        MockTaskContext {
            inner: Arc::new(MockTaskContextInner {
                invocation_id: self.invocation_id.unwrap_or_else(Uuid::new_v4),
                run_id: self.run_id.unwrap_or_else(Uuid::new_v4),
                task_name: self.task_name.unwrap_or_else(|| "test-task".to_string()),
                attempt: self.attempt.unwrap_or(1),
                metadata: self.metadata,
                parent_outputs: self.parent_outputs,
                resumption: self.resumption,
                cancelled: AtomicBool::new(self.cancelled),
                chunks: RwLock::new(Vec::new()),
            }),
        }
    }
}

#[async_trait]
impl TaskContext for MockTaskContext {
    fn invocation_id(&self) -> Uuid {
        self.inner.invocation_id
    }

    fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    fn task_name(&self) -> &str {
        &self.inner.task_name
    }

    fn attempt(&self) -> u32 {
        self.inner.attempt
    }

    fn metadata(&self) -> &HashMap<String, String> {
        &self.inner.metadata
    }

    fn parent_output_value(&self, task: &str) -> Option<&Value> {
        self.inner.parent_outputs.get(task)
    }

    fn resumption(&self) -> Option<&Resumption> {
        self.inner.resumption.as_ref()
    }

    fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    async fn stream(&self, content: ChunkContent) -> Result<()> {
        self.inner.chunks.write().push(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KestrelError;
    use crate::task::context::TaskContextExt;
    use kestrel_core::Suspension;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_mock_task_context_defaults() {
        let ctx = MockTaskContext::new();
        assert!(!ctx.invocation_id().is_nil());
        assert_eq!(ctx.attempt(), 1);
        assert_eq!(ctx.task_name(), "test-task");
        assert!(ctx.resumption().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_mock_task_context_parent_output() {
        let ctx = MockTaskContext::builder()
            .parent_output("fetch", json!({"rows": 3}))
            .build();

        let rows: serde_json::Map<String, Value> = ctx.parent_output("fetch").unwrap();
        assert_eq!(rows.get("rows"), Some(&json!(3)));
        assert!(matches!(
            ctx.parent_output::<Value>("missing"),
            Err(KestrelError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_task_context_records_chunks() {
        let ctx = MockTaskContext::new();
        ctx.stream_text("Hel").await.unwrap();
        ctx.stream_text("lo").await.unwrap();
        ctx.stream_progress(0.5, Some("halfway")).await.unwrap();

        assert_eq!(ctx.chunks().len(), 3);
        assert_eq!(ctx.text_chunks().concat(), "Hello");
        assert_eq!(ctx.last_progress(), Some(0.5));

        ctx.clear_chunks();
        assert!(ctx.chunks().is_empty());
    }

    #[tokio::test]
    async fn test_mock_task_context_cancellation() {
        let ctx = MockTaskContext::new();
        assert!(ctx.check_cancellation().await.is_ok());

        let clone = ctx.clone();
        clone.cancel();
        assert!(matches!(
            ctx.check_cancellation().await,
            Err(KestrelError::TaskCancelled)
        ));
    }

    #[test]
    fn test_suspend_from_resumed_context_increments_step() {
        let ctx = MockTaskContext::builder()
            .resuming(1, json!({"sent": true}), ResumeCause::SleepElapsed)
            .build();
        assert_eq!(ctx.step(), 1);
        assert_eq!(ctx.checkpoint::<Value>().unwrap(), Some(json!({"sent": true})));

        let err = ctx
            .sleep_for(Duration::from_secs(5), &json!({"sent": true, "again": true}))
            .unwrap_err();
        match err {
            KestrelError::Suspended(request) => {
                assert_eq!(request.step, 2);
                assert_eq!(request.suspension, Suspension::Sleep { duration_ms: 5000 });
            }
            other => panic!("expected suspension, got {:?}", other),
        }
    }
}
