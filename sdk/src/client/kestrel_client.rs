//! KestrelClient - main entry point of the SDK
//!
//! The client owns the transport to the scheduler and the workflows this
//! process has registered. It is an explicit object: construct it with
//! [`KestrelClient::builder`], pass it (or clones of it) wherever runs are
//! triggered, and call [`KestrelClient::shutdown`] to tear down its workers.

use crate::client::builder::KestrelClientBuilder;
use crate::client::run_handle::RunHandle;
use crate::client::stream::RunStream;
use crate::client::transport::SchedulerTransport;
use crate::client::triggers::{Crons, Events, Schedules};
use crate::client::run_output::RunOutput;
use crate::config::KestrelClientConfig;
use crate::error::Result;
use crate::task::definition::TaskDefinition;
use crate::worker::task_worker::{TaskWorker, WorkerHandle};
use crate::workflow::definition::Workflow;
use crate::workflow::registry::WorkflowRegistry;
use kestrel_core::{SubmitRun, TriggerOptions};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Options for [`KestrelClient::run_no_wait`]
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// A repeated key returns the original run instead of creating a new one
    pub idempotency_key: Option<String>,
    /// Stored on the run and visible to its tasks
    pub metadata: HashMap<String, String>,
    /// Higher values are dispatched first among ready work
    pub priority: i32,
    /// Local timeout of the returned handle
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn trigger_options(&self) -> TriggerOptions {
        TriggerOptions {
            idempotency_key: self.idempotency_key.clone(),
            metadata: self.metadata.clone(),
            priority: self.priority,
        }
    }
}

pub(crate) struct ClientInner {
    pub(crate) config: KestrelClientConfig,
    pub(crate) transport: Arc<dyn SchedulerTransport>,
    pub(crate) workflows: Arc<WorkflowRegistry>,
    pub(crate) workers: Mutex<Vec<WorkerHandle>>,
}

/// Main client. Clones share the transport, registry and workers.
#[derive(Clone)]
pub struct KestrelClient {
    inner: Arc<ClientInner>,
}

impl KestrelClient {
    pub fn builder() -> KestrelClientBuilder {
        KestrelClientBuilder::new()
    }

    pub(crate) fn from_parts(
        config: KestrelClientConfig,
        transport: Arc<dyn SchedulerTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                workflows: Arc::new(WorkflowRegistry::new()),
                workers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &KestrelClientConfig {
        &self.inner.config
    }

    pub fn namespace(&self) -> &str {
        &self.inner.config.namespace
    }

    pub fn transport(&self) -> &Arc<dyn SchedulerTransport> {
        &self.inner.transport
    }

    pub fn workflows(&self) -> &WorkflowRegistry {
        &self.inner.workflows
    }

    pub fn has_workflow(&self, name: &str) -> bool {
        self.inner.workflows.has(name)
    }

    /// Register a compiled workflow with the scheduler and keep its task
    /// bodies for workers started by this client.
    pub async fn register_workflow(&self, workflow: Workflow) -> Result<()> {
        self.inner
            .transport
            .register_workflow(workflow.manifest())
            .await?;
        info!(
            workflow = %workflow.name(),
            tasks = workflow.graph().len(),
            fingerprint = %workflow.manifest().fingerprint(),
            "Workflow registered"
        );
        self.inner.workflows.register(workflow);
        Ok(())
    }

    /// Register a task as a single-node workflow of the same name
    pub async fn register_task<T>(&self, task: T) -> Result<()>
    where
        T: TaskDefinition + 'static,
    {
        self.register_workflow(Workflow::from_task(task)?).await
    }

    /// Serialize `input` and check it against the workflow's declared type.
    /// Workflows this process does not know are left to the scheduler.
    pub(crate) fn prepare_input<I: Serialize>(&self, workflow: &str, input: &I) -> Result<Value> {
        let input = serde_json::to_value(input)?;
        if let Some(definition) = self.inner.workflows.get(workflow) {
            definition.validate_input(&input)?;
        }
        Ok(input)
    }

    /// Submit a run and wait for its result.
    pub async fn run<I: Serialize>(&self, workflow: &str, input: &I) -> Result<RunOutput> {
        self.run_no_wait(workflow, input, RunOptions::default())
            .await?
            .result()
            .await
    }

    /// Submit a run and return its handle without waiting.
    ///
    /// Invalid input fails here, before anything is sent. Transport errors
    /// are returned as-is; the submission is never retried implicitly.
    pub async fn run_no_wait<I: Serialize>(
        &self,
        workflow: &str,
        input: &I,
        options: RunOptions,
    ) -> Result<RunHandle> {
        let input = self.prepare_input(workflow, input)?;
        let submitted = self
            .inner
            .transport
            .submit_run(SubmitRun {
                workflow: workflow.to_string(),
                input,
                options: options.trigger_options(),
            })
            .await?;

        if submitted.reused {
            debug!(run_id = %submitted.run_id, workflow, "Idempotency key matched an existing run");
        } else {
            info!(run_id = %submitted.run_id, workflow, "Run submitted");
        }

        Ok(RunHandle::new(
            submitted.run_id,
            workflow,
            Arc::clone(&self.inner.transport),
            self.inner.config.result_poll_interval,
            options.timeout,
        ))
    }

    /// Re-attach to an existing run
    pub async fn run_handle(&self, run_id: Uuid) -> Result<RunHandle> {
        let snapshot = self.inner.transport.get_run_result(run_id).await?;
        let handle = RunHandle::new(
            run_id,
            snapshot.workflow,
            Arc::clone(&self.inner.transport),
            self.inner.config.result_poll_interval,
            None,
        );
        handle.refresh().await?;
        Ok(handle)
    }

    /// Subscribe to a run's chunks from now on
    pub async fn subscribe(&self, run_id: Uuid) -> Result<RunStream> {
        let chunks = self.inner.transport.subscribe_stream(run_id).await?;
        Ok(RunStream::new(run_id, chunks))
    }

    pub fn events(&self) -> Events<'_> {
        Events::new(self)
    }

    pub fn schedules(&self) -> Schedules<'_> {
        Schedules::new(self)
    }

    pub fn crons(&self) -> Crons<'_> {
        Crons::new(self)
    }

    /// Start a worker serving every workflow registered on this client.
    pub async fn start_worker(&self, worker_name: &str) -> Result<WorkerHandle> {
        let worker = TaskWorker::new(
            worker_name,
            Arc::clone(&self.inner.transport),
            Arc::clone(&self.inner.workflows),
            self.inner.config.worker.clone(),
        );
        let handle = worker.spawn();
        self.inner.workers.lock().push(handle.clone());
        Ok(handle)
    }

    /// Shut down every worker started through this client.
    pub async fn shutdown(&self) {
        let workers: Vec<WorkerHandle> = std::mem::take(&mut *self.inner.workers.lock());
        for worker in workers {
            worker.shutdown().await;
        }
        info!(namespace = %self.inner.config.namespace, "Client shut down");
    }
}

impl std::fmt::Debug for KestrelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KestrelClient")
            .field("host_port", &self.inner.config.host_port)
            .field("namespace", &self.inner.config.namespace)
            .field("workflows", &self.inner.workflows.names())
            .finish()
    }
}
