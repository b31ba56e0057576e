//! Scheduler client wrapper

use super::auth::AuthInterceptor;
use super::convert;
use crate::error::CoreResult;
use crate::generated::kestrel_v1 as pb;
use crate::generated::kestrel_v1::scheduler_client::SchedulerClient;
use crate::graph::WorkflowManifest;
use crate::run::RunSnapshot;
use crate::task::StreamChunk;
use crate::trigger::{CronEntry, ScheduleEntry, SubmitRun, SubmittedRun};
use crate::worker::{TaskCompletion, WorkerCommand, WorkerRegistration};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tonic::codec::Streaming;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tracing::debug;
use uuid::Uuid;

/// Type alias for authenticated client
type AuthClient = SchedulerClient<InterceptedService<Channel, AuthInterceptor>>;

/// Typed access to every scheduler RPC.
#[derive(Clone)]
pub struct Scheduler {
    inner: AuthClient,
    namespace: String,
}

impl Scheduler {
    /// Create from a channel with authentication
    pub fn new(channel: Channel, namespace: &str, token: Option<&str>) -> CoreResult<Self> {
        let interceptor = AuthInterceptor::new(token)?;
        Ok(Self {
            inner: SchedulerClient::with_interceptor(channel, interceptor),
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Register (or re-register) a workflow graph.
    pub async fn register_workflow(&mut self, manifest: &WorkflowManifest) -> CoreResult<()> {
        let request = pb::RegisterWorkflowRequest {
            namespace: self.namespace.clone(),
            name: manifest.name.clone(),
            manifest: serde_json::to_vec(manifest)?,
            fingerprint: manifest.fingerprint(),
        };
        self.inner.register_workflow(request).await?;
        Ok(())
    }

    pub async fn submit_run(&mut self, submit: &SubmitRun) -> CoreResult<SubmittedRun> {
        let request = pb::SubmitRunRequest {
            namespace: self.namespace.clone(),
            workflow_name: submit.workflow.clone(),
            input: serde_json::to_vec(&submit.input)?,
            idempotency_key: submit.options.idempotency_key.clone(),
            metadata: submit.options.metadata.clone(),
            priority: submit.options.priority,
        };
        let response = self.inner.submit_run(request).await?.into_inner();
        Ok(SubmittedRun {
            run_id: convert::parse_id("run", &response.run_id)?,
            reused: response.idempotency_key_reused,
        })
    }

    pub async fn get_run_result(&mut self, run_id: Uuid) -> CoreResult<RunSnapshot> {
        let request = pb::GetRunResultRequest {
            run_id: run_id.to_string(),
        };
        let response = self.inner.get_run_result(request).await?;
        convert::snapshot_from_wire(response.into_inner())
    }

    pub async fn subscribe_stream(&mut self, run_id: Uuid) -> CoreResult<ChunkStream> {
        let request = pb::SubscribeStreamRequest {
            run_id: run_id.to_string(),
        };
        let response = self.inner.subscribe_stream(request).await?;
        Ok(ChunkStream {
            inner: response.into_inner(),
            finished: false,
        })
    }

    pub async fn cancel_run(&mut self, run_id: Uuid, reason: &str) -> CoreResult<()> {
        let request = pb::CancelRunRequest {
            run_id: run_id.to_string(),
            reason: reason.to_string(),
        };
        self.inner.cancel_run(request).await?;
        Ok(())
    }

    pub async fn push_event(&mut self, event_key: &str, payload: &Value) -> CoreResult<()> {
        let request = pb::PushEventRequest {
            namespace: self.namespace.clone(),
            event_key: event_key.to_string(),
            payload: serde_json::to_vec(payload)?,
        };
        self.inner.push_event(request).await?;
        Ok(())
    }

    pub async fn create_schedule(
        &mut self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: &Value,
    ) -> CoreResult<Uuid> {
        let request = pb::CreateScheduleRequest {
            namespace: self.namespace.clone(),
            workflow_name: workflow.to_string(),
            trigger_at_ms: trigger_at.timestamp_millis(),
            input: serde_json::to_vec(input)?,
        };
        let response = self.inner.create_schedule(request).await?.into_inner();
        convert::parse_id("schedule", &response.schedule_id)
    }

    pub async fn delete_schedule(&mut self, schedule_id: Uuid) -> CoreResult<()> {
        let request = pb::DeleteScheduleRequest {
            schedule_id: schedule_id.to_string(),
        };
        self.inner.delete_schedule(request).await?;
        Ok(())
    }

    pub async fn list_schedules(&mut self, workflow: Option<&str>) -> CoreResult<Vec<ScheduleEntry>> {
        let request = pb::ListSchedulesRequest {
            namespace: self.namespace.clone(),
            workflow_name: workflow.map(str::to_string),
        };
        let response = self.inner.list_schedules(request).await?.into_inner();
        response
            .entries
            .into_iter()
            .map(convert::schedule_from_wire)
            .collect()
    }

    pub async fn create_cron(
        &mut self,
        workflow: &str,
        expression: &str,
        input: &Value,
    ) -> CoreResult<Uuid> {
        let request = pb::CreateCronRequest {
            namespace: self.namespace.clone(),
            workflow_name: workflow.to_string(),
            expression: expression.to_string(),
            input: serde_json::to_vec(input)?,
        };
        let response = self.inner.create_cron(request).await?.into_inner();
        convert::parse_id("cron", &response.cron_id)
    }

    pub async fn delete_cron(&mut self, cron_id: Uuid) -> CoreResult<()> {
        let request = pb::DeleteCronRequest {
            cron_id: cron_id.to_string(),
        };
        self.inner.delete_cron(request).await?;
        Ok(())
    }

    pub async fn list_crons(&mut self, workflow: Option<&str>) -> CoreResult<Vec<CronEntry>> {
        let request = pb::ListCronsRequest {
            namespace: self.namespace.clone(),
            workflow_name: workflow.map(str::to_string),
        };
        let response = self.inner.list_crons(request).await?.into_inner();
        response
            .entries
            .into_iter()
            .map(convert::cron_from_wire)
            .collect()
    }

    /// Open the long-lived command stream for a worker.
    pub async fn register_worker(
        &mut self,
        registration: &WorkerRegistration,
    ) -> CoreResult<CommandStream> {
        let request = pb::RegisterWorkerRequest {
            namespace: self.namespace.clone(),
            worker_name: registration.worker_name.clone(),
            workflow_names: registration.workflows.clone(),
            slots: registration.slots,
        };
        let response = self.inner.register_worker(request).await?;
        debug!(worker = %registration.worker_name, "Worker command stream opened");
        Ok(CommandStream {
            inner: response.into_inner(),
        })
    }

    pub async fn complete_task(&mut self, completion: &TaskCompletion) -> CoreResult<()> {
        let request = pb::CompleteTaskRequest {
            invocation_id: completion.invocation_id.to_string(),
            run_id: completion.run_id.to_string(),
            task: completion.task.clone(),
            result: serde_json::to_vec(&completion.result)?,
        };
        self.inner.complete_task(request).await?;
        Ok(())
    }

    pub async fn publish_chunk(&mut self, chunk: &StreamChunk) -> CoreResult<()> {
        let request = convert::chunk_to_wire(chunk)?;
        self.inner.publish_chunk(request).await?;
        Ok(())
    }
}

/// Chunks of one run, ending at the server's end-of-stream marker.
pub struct ChunkStream {
    inner: Streaming<pb::StreamChunk>,
    finished: bool,
}

impl ChunkStream {
    /// Next chunk, or `None` once the stream is closed or marked finished.
    pub async fn next(&mut self) -> CoreResult<Option<StreamChunk>> {
        if self.finished {
            return Ok(None);
        }
        match self.inner.message().await? {
            Some(message) => {
                let chunk = convert::chunk_from_wire(message)?;
                self.finished = chunk.is_none();
                Ok(chunk)
            }
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }
}

/// Commands the scheduler streams to one worker.
pub struct CommandStream {
    inner: Streaming<pb::WorkerCommand>,
}

impl CommandStream {
    /// Next command, or `None` when the server closes the stream.
    pub async fn next(&mut self) -> CoreResult<Option<WorkerCommand>> {
        match self.inner.message().await? {
            Some(message) => convert::command_from_wire(message).map(Some),
            None => Ok(None),
        }
    }
}
