//! Transport wrappers for failure-path tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kestrel_sdk::client::{ChunkStream, CommandStream, SchedulerTransport};
use kestrel_sdk::error::{KestrelError, Result};
use kestrel_sdk::testing::TestScheduler;
use kestrel_core::{
    CronEntry, RunSnapshot, ScheduleEntry, StreamChunk, SubmitRun, SubmittedRun, TaskCompletion,
    WorkerRegistration, WorkflowManifest,
};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Delegates to a [`TestScheduler`] but fails every submission with a
/// transport error, counting attempts.
#[derive(Clone)]
pub struct UnreachableSubmit {
    pub scheduler: TestScheduler,
    pub submissions: Arc<AtomicU32>,
}

impl UnreachableSubmit {
    pub fn new(scheduler: TestScheduler) -> Self {
        Self {
            scheduler,
            submissions: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl SchedulerTransport for UnreachableSubmit {
    async fn register_workflow(&self, manifest: &WorkflowManifest) -> Result<()> {
        self.scheduler.register_workflow(manifest).await
    }

    async fn submit_run(&self, _submit: SubmitRun) -> Result<SubmittedRun> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Err(KestrelError::Transport("connection reset by peer".to_string()))
    }

    async fn get_run_result(&self, run_id: Uuid) -> Result<RunSnapshot> {
        self.scheduler.get_run_result(run_id).await
    }

    async fn subscribe_stream(&self, run_id: Uuid) -> Result<ChunkStream> {
        self.scheduler.subscribe_stream(run_id).await
    }

    async fn cancel_run(&self, run_id: Uuid, reason: &str) -> Result<()> {
        self.scheduler.cancel_run(run_id, reason).await
    }

    async fn push_event(&self, event_key: &str, payload: Value) -> Result<()> {
        self.scheduler.push_event(event_key, payload).await
    }

    async fn create_schedule(
        &self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: Value,
    ) -> Result<Uuid> {
        self.scheduler.create_schedule(workflow, trigger_at, input).await
    }

    async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        self.scheduler.delete_schedule(schedule_id).await
    }

    async fn list_schedules(&self, workflow: Option<&str>) -> Result<Vec<ScheduleEntry>> {
        self.scheduler.list_schedules(workflow).await
    }

    async fn create_cron(&self, workflow: &str, expression: &str, input: Value) -> Result<Uuid> {
        self.scheduler.create_cron(workflow, expression, input).await
    }

    async fn delete_cron(&self, cron_id: Uuid) -> Result<()> {
        self.scheduler.delete_cron(cron_id).await
    }

    async fn list_crons(&self, workflow: Option<&str>) -> Result<Vec<CronEntry>> {
        self.scheduler.list_crons(workflow).await
    }

    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<CommandStream> {
        self.scheduler.register_worker(registration).await
    }

    async fn complete_task(&self, completion: TaskCompletion) -> Result<()> {
        self.scheduler.complete_task(completion).await
    }

    async fn publish_chunk(&self, chunk: StreamChunk) -> Result<()> {
        self.scheduler.publish_chunk(chunk).await
    }
}
