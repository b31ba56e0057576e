//! Test environment wiring a client and a worker to an in-memory scheduler.

use crate::client::{KestrelClient, SchedulerTransport};
use crate::config::WorkerSettings;
use crate::error::Result;
use crate::worker::WorkerHandle;
use crate::workflow::definition::Workflow;
use chrono::{DateTime, Utc};
use kestrel_core::ReconnectionStrategy;
use std::sync::Arc;
use std::time::Duration;

use super::{TestScheduler, TimeController};

/// Worker name used by [`TestEnvironment`]
pub const TEST_WORKER: &str = "test-worker";

/// Client, worker and [`TestScheduler`] in one process.
///
/// Task bodies run on real tokio tasks; scheduler timers (sleeps, waits,
/// backoff, schedules, crons) only move when [`TestEnvironment::advance`]
/// is called.
///
/// # Example
///
/// ```ignore
/// use kestrel_sdk::testing::TestEnvironment;
/// use serde_json::json;
///
/// let env = TestEnvironment::builder().workflow(reminder_workflow()?).build().await?;
/// let handle = env.client().run_no_wait("reminder", &json!({}), Default::default()).await?;
/// env.advance(Duration::from_secs(3600)).await;
/// let output = handle.result().await?;
/// ```
pub struct TestEnvironment {
    scheduler: TestScheduler,
    client: KestrelClient,
    worker: Option<WorkerHandle>,
}

impl TestEnvironment {
    pub fn builder() -> TestEnvironmentBuilder {
        TestEnvironmentBuilder::default()
    }

    /// Environment with `workflows` registered and a worker running.
    pub async fn new(workflows: Vec<Workflow>) -> Result<Self> {
        workflows
            .into_iter()
            .fold(Self::builder(), TestEnvironmentBuilder::workflow)
            .build()
            .await
    }

    pub fn client(&self) -> &KestrelClient {
        &self.client
    }

    pub fn scheduler(&self) -> &TestScheduler {
        &self.scheduler
    }

    pub fn worker(&self) -> Option<&WorkerHandle> {
        self.worker.as_ref()
    }

    pub fn time(&self) -> &TimeController {
        self.scheduler.time()
    }

    /// Current virtual time
    pub fn now(&self) -> DateTime<Utc> {
        self.scheduler.now()
    }

    /// Advance virtual time, letting dispatched work finish along the way.
    pub async fn advance(&self, duration: Duration) {
        self.scheduler.advance(duration).await;
    }

    /// Wait until no dispatched invocation is outstanding.
    pub async fn settle(&self) {
        self.scheduler.settle().await;
    }

    /// Start the worker if it is not running and wait until it registered.
    pub async fn start_worker(&mut self) -> Result<&WorkerHandle> {
        if let Some(worker) = self.worker.take() {
            if worker.is_running() {
                return Ok(self.worker.insert(worker));
            }
        }
        let worker = self.client.start_worker(TEST_WORKER).await?;
        worker.await_ready().await?;
        Ok(self.worker.insert(worker))
    }

    /// Stop the worker, cancelling whatever it still runs after the grace period.
    pub async fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown().await;
        }
    }

    pub async fn shutdown(mut self) {
        self.stop_worker().await;
        self.client.shutdown().await;
    }
}

impl std::fmt::Debug for TestEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnvironment")
            .field("scheduler", &self.scheduler)
            .field("worker", &self.worker.as_ref().map(WorkerHandle::name))
            .finish()
    }
}

/// Builder for [`TestEnvironment`].
pub struct TestEnvironmentBuilder {
    workflows: Vec<Workflow>,
    initial_time: Option<DateTime<Utc>>,
    slots: usize,
    shutdown_grace: Duration,
    start_worker: bool,
}

impl Default for TestEnvironmentBuilder {
    fn default() -> Self {
        Self {
            workflows: Vec::new(),
            initial_time: None,
            slots: 4,
            shutdown_grace: Duration::from_secs(1),
            start_worker: true,
        }
    }
}

impl TestEnvironmentBuilder {
    pub fn workflow(mut self, workflow: Workflow) -> Self {
        self.workflows.push(workflow);
        self
    }

    /// Start virtual time at `time` instead of now.
    pub fn initial_time(mut self, time: DateTime<Utc>) -> Self {
        self.initial_time = Some(time);
        self
    }

    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Leave the worker stopped until [`TestEnvironment::start_worker`].
    pub fn without_worker(mut self) -> Self {
        self.start_worker = false;
        self
    }

    pub async fn build(self) -> Result<TestEnvironment> {
        let time = match self.initial_time {
            Some(at) => TimeController::with_initial_time(at),
            None => TimeController::new(),
        };
        let scheduler = TestScheduler::with_time(time);
        let transport: Arc<dyn SchedulerTransport> = Arc::new(scheduler.clone());

        let worker_settings = WorkerSettings {
            slots: self.slots,
            reconnection: ReconnectionStrategy::Fixed {
                delay_ms: 5,
                max_attempts: None,
            },
            shutdown_grace: self.shutdown_grace,
            ..WorkerSettings::DEFAULT
        };

        let client = self
            .workflows
            .into_iter()
            .fold(KestrelClient::builder(), |builder, workflow| {
                builder.register_workflow(workflow)
            })
            .transport(transport)
            .worker_settings(worker_settings)
            .result_poll_interval(Duration::from_millis(5))
            .build()
            .await?;

        let mut env = TestEnvironment {
            scheduler,
            client,
            worker: None,
        };
        if self.start_worker {
            env.start_worker().await?;
        }
        Ok(env)
    }
}
