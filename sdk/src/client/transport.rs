//! The seam between the SDK and the external scheduler

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use kestrel_core::{
    CronEntry, RunSnapshot, ScheduleEntry, StreamChunk, SubmitRun, SubmittedRun, TaskCompletion,
    WorkerCommand, WorkerRegistration, WorkflowManifest,
};
use serde_json::Value;
use uuid::Uuid;

/// Ordered chunks of one run; ends when the run does.
pub type ChunkStream = BoxStream<'static, Result<StreamChunk>>;

/// Commands for one registered worker; ends when the scheduler drops it.
pub type CommandStream = BoxStream<'static, Result<WorkerCommand>>;

/// Every RPC the SDK issues against the scheduler.
///
/// [`GrpcTransport`](super::GrpcTransport) talks to a real scheduler;
/// the `testing` feature provides an in-memory implementation.
#[async_trait]
pub trait SchedulerTransport: Send + Sync {
    /// Register (or idempotently re-register) a compiled workflow
    async fn register_workflow(&self, manifest: &WorkflowManifest) -> Result<()>;

    async fn submit_run(&self, submit: SubmitRun) -> Result<SubmittedRun>;

    /// Current snapshot of a run, terminal or not
    async fn get_run_result(&self, run_id: Uuid) -> Result<RunSnapshot>;

    /// Chunks emitted from now on. Empty if the run is already terminal.
    async fn subscribe_stream(&self, run_id: Uuid) -> Result<ChunkStream>;

    /// Request cancellation. A no-op for terminal runs.
    async fn cancel_run(&self, run_id: Uuid, reason: &str) -> Result<()>;

    /// Fire-and-forget event
    async fn push_event(&self, event_key: &str, payload: Value) -> Result<()>;

    async fn create_schedule(
        &self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: Value,
    ) -> Result<Uuid>;

    async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()>;

    async fn list_schedules(&self, workflow: Option<&str>) -> Result<Vec<ScheduleEntry>>;

    /// `expression` is already normalised to six fields
    async fn create_cron(&self, workflow: &str, expression: &str, input: Value) -> Result<Uuid>;

    async fn delete_cron(&self, cron_id: Uuid) -> Result<()>;

    async fn list_crons(&self, workflow: Option<&str>) -> Result<Vec<CronEntry>>;

    /// Open the long-lived command stream for a worker
    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<CommandStream>;

    async fn complete_task(&self, completion: TaskCompletion) -> Result<()>;

    async fn publish_chunk(&self, chunk: StreamChunk) -> Result<()>;
}
