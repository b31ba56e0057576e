//! SchedulerTransport over the generated tonic client

use crate::client::transport::{ChunkStream, CommandStream, SchedulerTransport};
use crate::config::{KestrelClientConfig, TlsStrategy};
use crate::error::{KestrelError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kestrel_core::{
    CronEntry, RunSnapshot, ScheduleEntry, Scheduler, StreamChunk, SubmitRun, SubmittedRun,
    TaskCompletion, WorkerRegistration, WorkflowManifest,
};
use serde_json::Value;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::debug;
use uuid::Uuid;

/// gRPC transport to a `kestrel.v1.Scheduler` service.
///
/// The underlying tonic client is cheap to clone, so each call works on its
/// own clone and calls never serialise on a lock.
#[derive(Clone)]
pub struct GrpcTransport {
    scheduler: Scheduler,
}

impl GrpcTransport {
    /// Connect using the address, TLS and auth settings in `config`
    pub async fn connect(config: &KestrelClientConfig) -> Result<Self> {
        let channel = Self::endpoint(config)?.connect().await?;
        debug!(host_port = %config.host_port, "Connected to scheduler");
        Self::from_channel(channel, config)
    }

    /// Wrap an existing channel
    pub fn from_channel(channel: Channel, config: &KestrelClientConfig) -> Result<Self> {
        let scheduler = Scheduler::new(channel, &config.namespace, config.token.as_deref())?;
        Ok(Self { scheduler })
    }

    fn endpoint(config: &KestrelClientConfig) -> Result<Endpoint> {
        let endpoint = Endpoint::from_shared(config.endpoint_uri())
            .map_err(|e| KestrelError::InvalidConfiguration(e.to_string()))?;

        match &config.tls_strategy {
            TlsStrategy::None => Ok(endpoint),
            TlsStrategy::Tls {
                ca_cert_pem,
                domain,
            } => {
                let mut tls = ClientTlsConfig::new().with_native_roots();
                if let Some(pem) = ca_cert_pem {
                    tls = tls.ca_certificate(Certificate::from_pem(pem));
                }
                if let Some(domain) = domain {
                    tls = tls.domain_name(domain.clone());
                }
                Ok(endpoint.tls_config(tls)?)
            }
        }
    }

    fn client(&self) -> Scheduler {
        self.scheduler.clone()
    }
}

impl std::fmt::Debug for GrpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcTransport")
            .field("namespace", &self.scheduler.namespace())
            .finish()
    }
}

#[async_trait]
impl SchedulerTransport for GrpcTransport {
    async fn register_workflow(&self, manifest: &WorkflowManifest) -> Result<()> {
        Ok(self.client().register_workflow(manifest).await?)
    }

    async fn submit_run(&self, submit: SubmitRun) -> Result<SubmittedRun> {
        Ok(self.client().submit_run(&submit).await?)
    }

    async fn get_run_result(&self, run_id: Uuid) -> Result<RunSnapshot> {
        Ok(self.client().get_run_result(run_id).await?)
    }

    async fn subscribe_stream(&self, run_id: Uuid) -> Result<ChunkStream> {
        let chunks = self.client().subscribe_stream(run_id).await?;
        let stream = futures::stream::unfold(Some(chunks), |state| async move {
            let Some(mut chunks) = state else {
                return None;
            };
            match chunks.next().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(chunks))),
                Ok(None) => None,
                Err(e) => Some((Err(KestrelError::from(e)), None)),
            }
        });
        Ok(stream.boxed())
    }

    async fn cancel_run(&self, run_id: Uuid, reason: &str) -> Result<()> {
        Ok(self.client().cancel_run(run_id, reason).await?)
    }

    async fn push_event(&self, event_key: &str, payload: Value) -> Result<()> {
        Ok(self.client().push_event(event_key, &payload).await?)
    }

    async fn create_schedule(
        &self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: Value,
    ) -> Result<Uuid> {
        Ok(self
            .client()
            .create_schedule(workflow, trigger_at, &input)
            .await?)
    }

    async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        Ok(self.client().delete_schedule(schedule_id).await?)
    }

    async fn list_schedules(&self, workflow: Option<&str>) -> Result<Vec<ScheduleEntry>> {
        Ok(self.client().list_schedules(workflow).await?)
    }

    async fn create_cron(&self, workflow: &str, expression: &str, input: Value) -> Result<Uuid> {
        Ok(self.client().create_cron(workflow, expression, &input).await?)
    }

    async fn delete_cron(&self, cron_id: Uuid) -> Result<()> {
        Ok(self.client().delete_cron(cron_id).await?)
    }

    async fn list_crons(&self, workflow: Option<&str>) -> Result<Vec<CronEntry>> {
        Ok(self.client().list_crons(workflow).await?)
    }

    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<CommandStream> {
        let commands = self.client().register_worker(registration).await?;
        let stream = futures::stream::unfold(Some(commands), |state| async move {
            let Some(mut commands) = state else {
                return None;
            };
            match commands.next().await {
                Ok(Some(command)) => Some((Ok(command), Some(commands))),
                Ok(None) => None,
                Err(e) => Some((Err(KestrelError::from(e)), None)),
            }
        });
        Ok(stream.boxed())
    }

    async fn complete_task(&self, completion: TaskCompletion) -> Result<()> {
        Ok(self.client().complete_task(&completion).await?)
    }

    async fn publish_chunk(&self, chunk: StreamChunk) -> Result<()> {
        Ok(self.client().publish_chunk(&chunk).await?)
    }
}
