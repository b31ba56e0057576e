//! TaskContextImpl - Concrete implementation of TaskContext

use crate::client::SchedulerTransport;
use crate::error::Result;
use crate::task::context::TaskContext;
use async_trait::async_trait;
use kestrel_core::{ChunkContent, Resumption, StreamChunk, TaskInvocation};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

/// Context handed to a task body by the worker
pub struct TaskContextImpl {
    invocation: TaskInvocation,
    /// Tripped by a `Cancel` command or by run cancellation
    cancel: CancellationToken,
    /// Where stream chunks are published; `None` drops them
    publisher: Option<Arc<dyn SchedulerTransport>>,
    /// Next chunk sequence number for this invocation
    sequence: AtomicU64,
}

impl TaskContextImpl {
    pub fn new(invocation: TaskInvocation, cancel: CancellationToken) -> Self {
        Self {
            invocation,
            cancel,
            publisher: None,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish stream chunks through `transport`
    pub fn with_publisher(mut self, transport: Arc<dyn SchedulerTransport>) -> Self {
        self.publisher = Some(transport);
        self
    }

    pub fn invocation(&self) -> &TaskInvocation {
        &self.invocation
    }

    /// Mark the invocation as cancelled
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl std::fmt::Debug for TaskContextImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContextImpl")
            .field("invocation_id", &self.invocation.invocation_id)
            .field("run_id", &self.invocation.run_id)
            .field("task", &self.invocation.task)
            .field("attempt", &self.invocation.attempt)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[async_trait]
impl TaskContext for TaskContextImpl {
    fn invocation_id(&self) -> Uuid {
        self.invocation.invocation_id
    }

    fn run_id(&self) -> Uuid {
        self.invocation.run_id
    }

    fn task_name(&self) -> &str {
        &self.invocation.task
    }

    fn attempt(&self) -> u32 {
        self.invocation.attempt
    }

    fn metadata(&self) -> &HashMap<String, String> {
        &self.invocation.metadata
    }

    fn parent_output_value(&self, task: &str) -> Option<&Value> {
        self.invocation.parent_outputs.get(task)
    }

    fn resumption(&self) -> Option<&Resumption> {
        self.invocation.resumption.as_ref()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn stream(&self, content: ChunkContent) -> Result<()> {
        let Some(publisher) = &self.publisher else {
            return Ok(());
        };
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let chunk = StreamChunk::new(
            self.invocation.run_id,
            self.invocation.task.clone(),
            sequence,
            content,
        );
        if let Err(e) = publisher.publish_chunk(chunk).await {
            warn!(
                run_id = %self.invocation.run_id,
                task = %self.invocation.task,
                sequence,
                "Failed to publish stream chunk: {}",
                e
            );
        }
        Ok(())
    }
}
