//! TaskWorker - serves task invocations streamed by the scheduler
//!
//! A worker registers once per connection, then executes every `Invoke`
//! command on a slot pool of `slots` permits. A lost command stream is
//! re-established according to the configured [`ReconnectionStrategy`].
//!
//! [`ReconnectionStrategy`]: kestrel_core::ReconnectionStrategy

use crate::client::transport::{CommandStream, SchedulerTransport};
use crate::config::WorkerSettings;
use crate::error::{KestrelError, Result};
use crate::task::context_impl::TaskContextImpl;
use crate::task::executor::TaskExecutor;
use crate::workflow::registry::WorkflowRegistry;
use futures::StreamExt;
use kestrel_core::{
    Reconnector, TaskCompletion, TaskExecutionResult, TaskInvocation, WorkerCommand,
    WorkerRegistration,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type InFlight = Arc<Mutex<HashMap<Uuid, CancellationToken>>>;

/// Why the serving loop left a connection
enum Disconnect {
    Shutdown,
    Lost(String),
}

/// Worker executing the tasks of the workflows in its registry
pub struct TaskWorker {
    name: String,
    transport: Arc<dyn SchedulerTransport>,
    workflows: Arc<WorkflowRegistry>,
    settings: WorkerSettings,
    executor: TaskExecutor,
    slots: Arc<Semaphore>,
    in_flight: InFlight,
    /// Parent of every invocation token; tripped when shutdown grace runs out
    root: CancellationToken,
}

impl TaskWorker {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn SchedulerTransport>,
        workflows: Arc<WorkflowRegistry>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            workflows,
            executor: TaskExecutor::new(settings.default_task_timeout),
            slots: Arc::new(Semaphore::new(settings.slots)),
            settings,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            root: CancellationToken::new(),
        }
    }

    /// Run the worker on the current runtime and return its handle.
    pub fn spawn(self) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        let in_flight = Arc::clone(&self.in_flight);
        let name = self.name.clone();

        let loop_running = Arc::clone(&running);
        let join = tokio::spawn(async move {
            self.run(shutdown_rx, ready_tx).await;
            loop_running.store(false, Ordering::SeqCst);
        });

        WorkerHandle {
            inner: Arc::new(HandleInner {
                name,
                shutdown_tx,
                ready_rx,
                running,
                in_flight,
                join: Mutex::new(Some(join)),
            }),
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>, ready_tx: watch::Sender<bool>) {
        info!(
            worker = %self.name,
            slots = self.settings.slots,
            workflows = self.workflows.len(),
            "Starting task worker"
        );

        let mut reconnector = Reconnector::new(self.settings.reconnection.clone());

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let registration = WorkerRegistration {
                worker_name: self.name.clone(),
                workflows: self.workflows.names(),
                slots: u32::try_from(self.settings.slots).unwrap_or(u32::MAX),
            };

            let connected = tokio::select! {
                _ = shutdown_rx.changed() => break,
                result = self.transport.register_worker(&registration) => result,
            };

            let reason = match connected {
                Ok(commands) => {
                    if reconnector.attempts() > 0 {
                        info!(
                            worker = %self.name,
                            attempts = reconnector.attempts(),
                            "Reconnected to scheduler"
                        );
                    } else {
                        info!(worker = %self.name, workflows = ?registration.workflows, "Worker registered");
                    }
                    reconnector.reset();
                    ready_tx.send_replace(true);

                    match self.serve(commands, &mut shutdown_rx).await {
                        Disconnect::Shutdown => break,
                        Disconnect::Lost(reason) => reason,
                    }
                }
                Err(e) => e.to_string(),
            };

            ready_tx.send_replace(false);
            // The scheduler requeues whatever this connection had in flight.
            self.cancel_in_flight();

            match reconnector.next_delay() {
                Some(delay) => {
                    warn!(
                        worker = %self.name,
                        attempt = reconnector.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Scheduler connection lost, reconnecting"
                    );
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    error!(
                        worker = %self.name,
                        attempts = reconnector.attempts(),
                        reason = %reason,
                        "Reconnection attempts exhausted, stopping worker"
                    );
                    break;
                }
            }
        }

        ready_tx.send_replace(false);
        self.drain().await;
        info!(worker = %self.name, "Task worker stopped");
    }

    async fn serve(
        &self,
        mut commands: CommandStream,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Disconnect {
        loop {
            let command = tokio::select! {
                _ = shutdown_rx.changed() => return Disconnect::Shutdown,
                command = commands.next() => command,
            };

            match command {
                Some(Ok(WorkerCommand::Invoke(invocation))) => {
                    let permit = tokio::select! {
                        _ = shutdown_rx.changed() => return Disconnect::Shutdown,
                        permit = Arc::clone(&self.slots).acquire_owned() => permit,
                    };
                    let Ok(permit) = permit else {
                        return Disconnect::Shutdown;
                    };
                    self.dispatch(invocation, permit);
                }
                Some(Ok(WorkerCommand::Cancel {
                    invocation_id,
                    reason,
                })) => {
                    if let Some(token) = self.in_flight.lock().get(&invocation_id) {
                        info!(worker = %self.name, %invocation_id, reason = %reason, "Cancelling invocation");
                        token.cancel();
                    } else {
                        debug!(worker = %self.name, %invocation_id, "Cancel for unknown invocation ignored");
                    }
                }
                Some(Err(e)) => return Disconnect::Lost(e.to_string()),
                None => return Disconnect::Lost("command stream closed".to_string()),
            }
        }
    }

    fn dispatch(&self, invocation: TaskInvocation, permit: OwnedSemaphorePermit) {
        let token = self.root.child_token();
        self.in_flight
            .lock()
            .insert(invocation.invocation_id, token.clone());

        let task = self.workflows.task(&invocation.workflow, &invocation.task);
        let transport = Arc::clone(&self.transport);
        let executor = self.executor.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let worker = self.name.clone();

        info!(
            worker = %worker,
            run_id = %invocation.run_id,
            task = %invocation.task,
            attempt = invocation.attempt,
            resumed = invocation.resumption.is_some(),
            "Invocation received"
        );

        tokio::spawn(async move {
            let _permit = permit;
            let invocation_id = invocation.invocation_id;
            let run_id = invocation.run_id;
            let task_name = invocation.task.clone();

            let result = match task {
                Some(task) => {
                    let input = invocation.input.clone();
                    let timeout = invocation.timeout_ms.map(Duration::from_millis);
                    let ctx = Arc::new(
                        TaskContextImpl::new(invocation, token.clone())
                            .with_publisher(Arc::clone(&transport)),
                    );
                    executor.execute(&task, ctx, token, input, timeout).await
                }
                None => TaskExecutionResult::failed_with_type(
                    format!("Task '{}' is not registered on worker '{}'", task_name, worker),
                    "UNKNOWN_TASK",
                    false,
                ),
            };

            in_flight.lock().remove(&invocation_id);
            info!(
                worker = %worker,
                %run_id,
                task = %task_name,
                result = result.kind(),
                "Invocation finished"
            );

            let completion = TaskCompletion {
                invocation_id,
                run_id,
                task: task_name,
                result,
            };
            if let Err(e) = transport.complete_task(completion).await {
                warn!(worker = %worker, %invocation_id, error = %e, "Failed to report completion");
            }
        });
    }

    fn cancel_in_flight(&self) {
        for token in self.in_flight.lock().values() {
            token.cancel();
        }
    }

    /// Wait for running invocations, cancelling them once the grace period ends.
    async fn drain(&self) {
        let slots = u32::try_from(self.settings.slots).unwrap_or(u32::MAX);
        let drained =
            tokio::time::timeout(self.settings.shutdown_grace, self.slots.acquire_many(slots))
                .await;
        if drained.is_err() {
            let outstanding = self.in_flight.lock().len();
            warn!(
                worker = %self.name,
                outstanding,
                "Shutdown grace elapsed, cancelling invocations"
            );
            self.root.cancel();
            let _ = tokio::time::timeout(self.settings.shutdown_grace, self.slots.acquire_many(slots))
                .await;
        }
    }
}

struct HandleInner {
    name: String,
    shutdown_tx: watch::Sender<bool>,
    ready_rx: watch::Receiver<bool>,
    running: Arc<AtomicBool>,
    in_flight: InFlight,
    join: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running worker. Clones refer to the same worker.
#[derive(Clone)]
pub struct WorkerHandle {
    inner: Arc<HandleInner>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Wait until the worker holds a registered command stream.
    ///
    /// Fails with [`KestrelError::Shutdown`] if the worker stops first.
    pub async fn await_ready(&self) -> Result<()> {
        let mut ready = self.inner.ready_rx.clone();
        loop {
            if *ready.borrow_and_update() {
                return Ok(());
            }
            if !self.is_running() {
                return Err(KestrelError::Shutdown);
            }
            if ready.changed().await.is_err() {
                return Err(KestrelError::Shutdown);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Invocations currently executing on this worker
    pub fn active_invocations(&self) -> usize {
        self.inner.in_flight.lock().len()
    }

    /// Stop taking work and wait for in-flight invocations. Idempotent.
    pub async fn shutdown(&self) {
        self.inner.shutdown_tx.send_replace(true);
        let join = self.inner.join.lock().take();
        if let Some(join) = join {
            if let Err(e) = join.await {
                error!(worker = %self.inner.name, error = %e, "Worker task panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .field("active_invocations", &self.active_invocations())
            .finish()
    }
}
