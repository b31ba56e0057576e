//! RunHandle - cancelable, awaitable reference to one run
//!
//! The handle is a small state machine:
//!
//! ```text
//! Pending -> Running -> { Succeeded, Failed, Cancelled }
//! ```
//!
//! Remote snapshots move it forward, never backward, and a terminal state is
//! final. `cancel` moves it to `Cancelled` locally before the scheduler is told,
//! so every pending `result()` resolves at once.

use crate::client::run_output::RunOutput;
use crate::client::stream::RunStream;
use crate::client::transport::SchedulerTransport;
use crate::error::{KestrelError, Result};
use futures::future::BoxFuture;
use kestrel_core::{RunSnapshot, RunStatus};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Reason recorded when a handle's timeout elapses
pub const TIMEOUT_REASON: &str = "timeout";

/// Local view of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Pending,
    Running,
    Succeeded(RunOutput),
    Failed { task: String, error: String },
    Cancelled { reason: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded(_) | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }

    pub fn status(&self) -> RunStatus {
        match self {
            Self::Pending => RunStatus::Queued,
            Self::Running => RunStatus::Running,
            Self::Succeeded(_) => RunStatus::Succeeded,
            Self::Failed { .. } => RunStatus::Failed,
            Self::Cancelled { .. } => RunStatus::Cancelled,
        }
    }

    fn from_snapshot(snapshot: RunSnapshot) -> Self {
        match snapshot.status {
            RunStatus::Queued => Self::Pending,
            RunStatus::Running => Self::Running,
            RunStatus::Succeeded => Self::Succeeded(snapshot.into()),
            RunStatus::Failed => {
                let failure = snapshot.failure.unwrap_or_else(|| kestrel_core::RunFailure {
                    task: String::new(),
                    error: "run failed".to_string(),
                });
                Self::Failed {
                    task: failure.task,
                    error: failure.error,
                }
            }
            RunStatus::Cancelled => Self::Cancelled {
                reason: snapshot
                    .cancel_reason
                    .unwrap_or_else(|| "cancelled".to_string()),
            },
        }
    }

    /// Terminal states map to exactly one of output, run failure or cancellation
    fn outcome(&self, run_id: Uuid) -> Option<Result<RunOutput>> {
        match self {
            Self::Pending | Self::Running => None,
            Self::Succeeded(output) => Some(Ok(output.clone())),
            Self::Failed { task, error } => Some(Err(KestrelError::RunFailed {
                run_id,
                task: task.clone(),
                error: error.clone(),
            })),
            Self::Cancelled { reason } => Some(Err(KestrelError::Cancelled {
                run_id,
                reason: reason.clone(),
            })),
        }
    }
}

struct HandleInner {
    run_id: Uuid,
    workflow: String,
    transport: Arc<dyn SchedulerTransport>,
    poll_interval: Duration,
    /// Absolute deadline after which the handle cancels the run
    deadline: Option<Instant>,
    state: watch::Sender<RunState>,
}

/// Handle to one run. Clones share state.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<HandleInner>,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: Uuid,
        workflow: impl Into<String>,
        transport: Arc<dyn SchedulerTransport>,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        let (state, _) = watch::channel(RunState::Pending);
        Self {
            inner: Arc::new(HandleInner {
                run_id,
                workflow: workflow.into(),
                transport,
                poll_interval,
                deadline: timeout.map(|t| Instant::now() + t),
                state,
            }),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    pub fn workflow(&self) -> &str {
        &self.inner.workflow
    }

    /// Cached local state
    pub fn state(&self) -> RunState {
        self.inner.state.borrow().clone()
    }

    /// Cached status; call [`refresh`](Self::refresh) to update it
    pub fn status(&self) -> RunStatus {
        self.inner.state.borrow().status()
    }

    /// Fetch the remote snapshot and fold it into the local state.
    pub async fn refresh(&self) -> Result<RunSnapshot> {
        let snapshot = self.inner.transport.get_run_result(self.inner.run_id).await?;
        let next = RunState::from_snapshot(snapshot.clone());
        self.inner.state.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        });
        Ok(snapshot)
    }

    /// Wait for a terminal state.
    ///
    /// Resolves to the output map, [`KestrelError::RunFailed`] or
    /// [`KestrelError::Cancelled`]. If the handle has a timeout, the run is
    /// cancelled when it elapses and this resolves to `Cancelled`.
    ///
    /// Remote polls race local transitions, so a stalled scheduler never holds
    /// up a cancellation or the timeout.
    pub async fn result(&self) -> Result<RunOutput> {
        let mut changes = self.inner.state.subscribe();
        let deadline = self.inner.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        let mut delay = Duration::ZERO;
        loop {
            if let Some(outcome) = self.inner.state.borrow().outcome(self.inner.run_id) {
                return outcome;
            }

            tokio::select! {
                biased;
                _ = changes.changed() => {}
                _ = &mut expired => self.expire(),
                polled = self.poll_after(delay) => {
                    polled?;
                    delay = self.inner.poll_interval;
                }
            }
        }
    }

    async fn poll_after(&self, delay: Duration) -> Result<()> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.refresh().await.map(|_| ())
    }

    /// Cancel locally on timeout; the remote request runs in the background.
    fn expire(&self) {
        if !self.mark_cancelled(TIMEOUT_REASON) {
            return;
        }
        info!(run_id = %self.inner.run_id, "Run handle timed out, cancelling");
        let transport = Arc::clone(&self.inner.transport);
        let run_id = self.inner.run_id;
        tokio::spawn(async move {
            if let Err(e) = transport.cancel_run(run_id, TIMEOUT_REASON).await {
                warn!(run_id = %run_id, "Failed to cancel timed out run: {}", e);
            }
        });
    }

    /// Move to `Cancelled` unless already terminal. Returns whether it moved.
    fn mark_cancelled(&self, reason: &str) -> bool {
        self.inner.state.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            *current = RunState::Cancelled {
                reason: reason.to_string(),
            };
            true
        })
    }

    /// Request cancellation.
    ///
    /// Local awaiters fail with `Cancelled` immediately, whatever the scheduler
    /// does. Idempotent: a second call, or a call on a terminal handle, does
    /// nothing.
    pub async fn cancel(&self, reason: &str) -> Result<()> {
        if !self.mark_cancelled(reason) {
            debug!(run_id = %self.inner.run_id, "Cancel on terminal handle ignored");
            return Ok(());
        }

        info!(run_id = %self.inner.run_id, reason, "Cancelling run");
        self.inner
            .transport
            .cancel_run(self.inner.run_id, reason)
            .await
    }

    /// Subscribe to chunks emitted from now on
    pub async fn stream(&self) -> Result<RunStream> {
        let chunks = self
            .inner
            .transport
            .subscribe_stream(self.inner.run_id)
            .await?;
        Ok(RunStream::new(self.inner.run_id, chunks))
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.inner.run_id)
            .field("workflow", &self.inner.workflow)
            .field("status", &self.status())
            .finish()
    }
}

impl IntoFuture for RunHandle {
    type Output = Result<RunOutput>;
    type IntoFuture = BoxFuture<'static, Result<RunOutput>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.result().await })
    }
}
