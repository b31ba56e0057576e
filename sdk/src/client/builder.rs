//! KestrelClient builder for fluent configuration

use crate::client::grpc_transport::GrpcTransport;
use crate::client::kestrel_client::KestrelClient;
use crate::client::transport::SchedulerTransport;
use crate::config::{KestrelClientConfig, TlsStrategy, WorkerSettings};
use crate::error::Result;
use crate::task::definition::TaskDefinition;
use crate::workflow::definition::Workflow;
use std::sync::Arc;
use std::time::Duration;
use tonic::transport::Channel;
use tracing::debug;

/// Builder for creating KestrelClient instances
///
/// Example:
/// ```ignore
/// let client = KestrelClient::builder()
///     .host_port("scheduler:7077")
///     .namespace("billing")
///     .register_workflow(order_workflow)
///     .register_task(SendInvoice)
///     .build()
///     .await?;
/// ```
pub struct KestrelClientBuilder {
    config: KestrelClientConfig,
    transport: Option<Arc<dyn SchedulerTransport>>,
    channel: Option<Channel>,
    pending: Vec<Result<Workflow>>,
}

impl Default for KestrelClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KestrelClientBuilder {
    pub fn new() -> Self {
        Self {
            config: KestrelClientConfig::default(),
            transport: None,
            channel: None,
            pending: Vec::new(),
        }
    }

    /// Replace the whole configuration, e.g. with [`KestrelClientConfig::from_env`]
    pub fn config(mut self, config: KestrelClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn host_port(mut self, host_port: impl Into<String>) -> Self {
        self.config = self.config.with_host_port(host_port);
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config = self.config.with_namespace(namespace);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config = self.config.with_token(token);
        self
    }

    pub fn tls(mut self, tls: TlsStrategy) -> Self {
        self.config = self.config.with_tls(tls);
        self
    }

    pub fn slots(mut self, slots: usize) -> Self {
        self.config = self.config.with_slots(slots);
        self
    }

    pub fn worker_settings(mut self, settings: WorkerSettings) -> Self {
        self.config = self.config.with_worker_settings(settings);
        self
    }

    pub fn result_poll_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_result_poll_interval(interval);
        self
    }

    /// Use an existing channel instead of dialing `host_port`
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Use a custom transport, e.g. the in-memory test scheduler
    pub fn transport(mut self, transport: Arc<dyn SchedulerTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register a workflow once the client is built
    pub fn register_workflow(mut self, workflow: Workflow) -> Self {
        self.pending.push(Ok(workflow));
        self
    }

    /// Register a task as a single-node workflow once the client is built
    pub fn register_task<T>(mut self, task: T) -> Self
    where
        T: TaskDefinition + 'static,
    {
        self.pending.push(Workflow::from_task(task));
        self
    }

    /// Validate the configuration, connect and register pending workflows.
    pub async fn build(self) -> Result<KestrelClient> {
        self.config.validate()?;

        let transport: Arc<dyn SchedulerTransport> = match (self.transport, self.channel) {
            (Some(transport), _) => transport,
            (None, Some(channel)) => Arc::new(GrpcTransport::from_channel(channel, &self.config)?),
            (None, None) => Arc::new(GrpcTransport::connect(&self.config).await?),
        };

        let client = KestrelClient::from_parts(self.config, transport);
        for workflow in self.pending {
            client.register_workflow(workflow?).await?;
        }

        debug!(
            namespace = %client.namespace(),
            workflows = client.workflows().len(),
            "Client built"
        );
        Ok(client)
    }
}
