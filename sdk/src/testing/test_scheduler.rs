//! TestScheduler - an in-memory scheduler behind the transport seam
//!
//! Implements the scheduler side of the contract the SDK talks to: graph
//! evaluation with conditions and parent rules, concurrency admission,
//! dispatch to registered workers, retries, durable suspension and
//! resumption, event fan-out, schedules, crons and chunk streams.
//!
//! All scheduler-side timers run on a [`TimeController`] and only fire when
//! the test calls [`TestScheduler::advance`].

use super::limiter::{Admission, ConcurrencyLimiter, Owner};
use super::time_controller::{to_chrono, TimeController};
use crate::client::transport::{ChunkStream, CommandStream, SchedulerTransport};
use crate::error::{KestrelError, Result, ValidationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kestrel_core::trigger::normalize_cron_expression;
use kestrel_core::{
    calculate_backoff, should_retry, ConditionEvaluator, CronEntry, Decision, ResumeCause,
    Resumption, RunFailure, RunSnapshot, RunStatus, ScheduleEntry, StreamChunk, SubmitRun,
    SubmittedRun, SuspendRequest, Suspension, TaskCompletion, TaskExecutionResult, TaskInvocation,
    TaskNode, TaskOutcome, TaskRecord, TriggerOptions, WorkerCommand, WorkerRegistration,
    WorkflowManifest,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Cancellation reason recorded on runs evicted by a cancel strategy
pub const CONCURRENCY_REASON: &str = "concurrency";

const FAILED_RUN_REASON: &str = "run failed";

/// How often [`TestScheduler::settle`] re-checks for in-flight work
const SETTLE_POLL: Duration = Duration::from_millis(2);

#[derive(Debug, Clone)]
enum NodeState {
    /// Parents not terminal yet, or not evaluated since they became terminal
    Pending,
    /// Evaluable but held by a `wait-for-event` condition
    Waiting {
        since: DateTime<Utc>,
        timer: Option<String>,
    },
    /// Waiting for a task-level concurrency slot
    AwaitingSlot,
    Ready {
        attempt: u32,
        resumption: Option<Resumption>,
    },
    Backoff {
        attempt: u32,
        resumption: Option<Resumption>,
    },
    Running {
        invocation_id: Uuid,
        attempt: u32,
        resumption: Option<Resumption>,
    },
    Suspended {
        attempt: u32,
        request: SuspendRequest,
        timer: Option<String>,
    },
    Done,
}

impl NodeState {
    fn timer(&self) -> Option<&str> {
        match self {
            Self::Waiting { timer, .. } | Self::Suspended { timer, .. } => timer.as_deref(),
            _ => None,
        }
    }
}

struct Run {
    id: Uuid,
    sequence: u64,
    manifest: Arc<WorkflowManifest>,
    input: Value,
    metadata: HashMap<String, String>,
    priority: i32,
    status: RunStatus,
    nodes: HashMap<String, NodeState>,
    outcomes: HashMap<String, TaskOutcome>,
    records: Vec<TaskRecord>,
    failure: Option<RunFailure>,
    cancel_reason: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    /// Backoff timers keyed by task
    backoff_timers: HashMap<String, String>,
}

impl Run {
    fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.id,
            workflow: self.manifest.name.clone(),
            status: self.status,
            records: self.records.clone(),
            metadata: self.metadata.clone(),
            failure: self.failure.clone(),
            cancel_reason: self.cancel_reason.clone(),
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }

    fn node_state(&self, task: &str) -> Option<NodeState> {
        self.nodes.get(task).cloned()
    }

    fn set_node(&mut self, task: &str, state: NodeState) {
        self.nodes.insert(task.to_string(), state);
    }

    fn is_complete(&self) -> bool {
        self.nodes.values().all(|n| matches!(n, NodeState::Done))
    }
}

struct WorkerConnection {
    name: String,
    workflows: HashSet<String>,
    slots: usize,
    sender: mpsc::UnboundedSender<Result<WorkerCommand>>,
    in_flight: HashSet<Uuid>,
}

impl WorkerConnection {
    fn can_take(&self, workflow: &str) -> bool {
        self.workflows.contains(workflow)
            && self.in_flight.len() < self.slots
            && !self.sender.is_closed()
    }
}

struct InvocationRef {
    run_id: Uuid,
    task: String,
    connection: u64,
}

enum TimerAction {
    ConditionWait { run_id: Uuid, task: String },
    Backoff { run_id: Uuid, task: String },
    Resume { run_id: Uuid, task: String, cause: ResumeCause },
    Admission,
    Schedule(Uuid),
    Cron(Uuid),
}

struct CronState {
    entry: CronEntry,
    schedule: cron::Schedule,
    timer: Option<String>,
}

struct ScheduleState {
    entry: ScheduleEntry,
    timer: String,
}

struct State {
    time: TimeController,
    workflows: HashMap<String, Arc<WorkflowManifest>>,
    runs: HashMap<Uuid, Run>,
    /// Run ids in submission order
    run_order: Vec<Uuid>,
    next_sequence: u64,
    idempotency: HashMap<String, Uuid>,
    events: Vec<(String, Value)>,
    event_keys: HashSet<String>,
    limiter: ConcurrencyLimiter,
    admission_wakeup: Option<(DateTime<Utc>, String)>,
    workers: BTreeMap<u64, WorkerConnection>,
    next_connection: u64,
    invocations: HashMap<Uuid, InvocationRef>,
    subscribers: HashMap<Uuid, Vec<mpsc::UnboundedSender<Result<StreamChunk>>>>,
    schedules: HashMap<Uuid, ScheduleState>,
    crons: HashMap<Uuid, CronState>,
    timers: HashMap<String, TimerAction>,
    next_timer: u64,
}

impl State {
    fn new(time: TimeController) -> Self {
        Self {
            time,
            workflows: HashMap::new(),
            runs: HashMap::new(),
            run_order: Vec::new(),
            next_sequence: 0,
            idempotency: HashMap::new(),
            events: Vec::new(),
            event_keys: HashSet::new(),
            limiter: ConcurrencyLimiter::default(),
            admission_wakeup: None,
            workers: BTreeMap::new(),
            next_connection: 0,
            invocations: HashMap::new(),
            subscribers: HashMap::new(),
            schedules: HashMap::new(),
            crons: HashMap::new(),
            timers: HashMap::new(),
            next_timer: 0,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    fn run(&self, run_id: Uuid) -> Result<&Run> {
        self.runs
            .get(&run_id)
            .ok_or_else(|| KestrelError::not_found("Run", run_id))
    }

    fn is_running(&self, run_id: Uuid) -> bool {
        self.runs
            .get(&run_id)
            .is_some_and(|run| run.status == RunStatus::Running)
    }

    fn add_timer(&mut self, fire_at: DateTime<Utc>, action: TimerAction) -> String {
        let id = format!("timer-{}", self.next_timer);
        self.next_timer += 1;
        self.time.register_timer(&id, fire_at);
        self.timers.insert(id.clone(), action);
        id
    }

    fn drop_timer(&mut self, id: &str) {
        self.time.cancel_timer(id);
        self.timers.remove(id);
    }

    // ---- submission and admission ----

    fn submit(&mut self, submit: SubmitRun) -> Result<SubmittedRun> {
        let manifest = self
            .workflows
            .get(&submit.workflow)
            .cloned()
            .ok_or_else(|| KestrelError::not_found("Workflow", &submit.workflow))?;

        let scoped_key = submit
            .options
            .idempotency_key
            .as_ref()
            .map(|key| format!("{}/{}", submit.workflow, key));
        if let Some(run_id) = scoped_key.as_ref().and_then(|k| self.idempotency.get(k)) {
            debug!(run_id = %run_id, workflow = %submit.workflow, "Idempotency key reused");
            return Ok(SubmittedRun {
                run_id: *run_id,
                reused: true,
            });
        }

        let run_id = Uuid::new_v4();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let nodes = manifest
            .graph
            .nodes()
            .iter()
            .map(|node| (node.name.clone(), NodeState::Pending))
            .collect();

        self.limiter.enqueue(
            Owner::Run(run_id),
            &manifest.name,
            &manifest.concurrency,
            &submit.input,
        );

        self.runs.insert(
            run_id,
            Run {
                id: run_id,
                sequence,
                manifest: Arc::clone(&manifest),
                input: submit.input,
                metadata: submit.options.metadata,
                priority: submit.options.priority,
                status: RunStatus::Queued,
                nodes,
                outcomes: HashMap::new(),
                records: Vec::new(),
                failure: None,
                cancel_reason: None,
                created_at: self.time.now(),
                completed_at: None,
                backoff_timers: HashMap::new(),
            },
        );
        self.run_order.push(run_id);
        if let Some(key) = scoped_key {
            self.idempotency.insert(key, run_id);
        }

        info!(run_id = %run_id, workflow = %manifest.name, "Run submitted");
        self.admit_run(run_id);

        Ok(SubmittedRun {
            run_id,
            reused: false,
        })
    }

    fn admit_run(&mut self, run_id: Uuid) -> bool {
        let now = self.now();
        match self.limiter.try_admit(&Owner::Run(run_id), now) {
            Admission::Admitted { evict } => {
                if let Some(run) = self.runs.get_mut(&run_id) {
                    run.status = RunStatus::Running;
                }
                debug!(run_id = %run_id, "Run admitted");
                self.evict(evict);
                true
            }
            Admission::Blocked { retry_at } => {
                self.schedule_admission_wakeup(retry_at);
                false
            }
        }
    }

    fn try_admit_task(&mut self, run_id: Uuid, task: &str) -> bool {
        let now = self.now();
        match self
            .limiter
            .try_admit(&Owner::Task(run_id, task.to_string()), now)
        {
            Admission::Admitted { evict } => {
                if let Some(run) = self.runs.get_mut(&run_id) {
                    run.set_node(
                        task,
                        NodeState::Ready {
                            attempt: 1,
                            resumption: None,
                        },
                    );
                }
                self.evict(evict);
                true
            }
            Admission::Blocked { retry_at } => {
                self.schedule_admission_wakeup(retry_at);
                false
            }
        }
    }

    fn evict(&mut self, owners: Vec<Owner>) {
        for owner in owners {
            let run_id = owner.run_id();
            info!(run_id = %run_id, "Evicting run to admit newer work");
            if let Err(e) = self.cancel_run(run_id, CONCURRENCY_REASON) {
                warn!(run_id = %run_id, error = %e, "Eviction failed");
            }
        }
    }

    fn schedule_admission_wakeup(&mut self, retry_at: Option<DateTime<Utc>>) {
        let Some(at) = retry_at else {
            return;
        };
        if let Some((current, _)) = &self.admission_wakeup {
            if *current <= at {
                return;
            }
        }
        if let Some((_, timer)) = self.admission_wakeup.take() {
            self.drop_timer(&timer);
        }
        let timer = self.add_timer(at, TimerAction::Admission);
        self.admission_wakeup = Some((at, timer));
    }

    // ---- evaluation ----

    /// Evaluate and dispatch until nothing changes.
    fn pump(&mut self) {
        self.sweep_workers();
        loop {
            let mut progressed = false;

            let queued: Vec<Uuid> = self
                .run_order
                .iter()
                .copied()
                .filter(|id| {
                    self.runs
                        .get(id)
                        .is_some_and(|r| r.status == RunStatus::Queued)
                })
                .collect();
            for run_id in queued {
                progressed |= self.admit_run(run_id);
            }

            let running: Vec<Uuid> = self
                .run_order
                .iter()
                .copied()
                .filter(|id| self.is_running(*id))
                .collect();
            for run_id in running {
                progressed |= self.evaluate_run(run_id);
            }

            if !progressed {
                break;
            }
        }
        self.dispatch();
    }

    fn evaluate_run(&mut self, run_id: Uuid) -> bool {
        let Some(manifest) = self.runs.get(&run_id).map(|r| Arc::clone(&r.manifest)) else {
            return false;
        };
        let mut progressed = false;

        for name in manifest.graph.topological_order() {
            if !self.is_running(run_id) {
                return true;
            }
            let Some(node) = manifest.graph.node(name) else {
                continue;
            };
            let Some(state) = self.runs.get(&run_id).and_then(|r| r.node_state(name)) else {
                continue;
            };

            let since = match &state {
                NodeState::Pending => None,
                NodeState::Waiting { since, .. } => Some(*since),
                NodeState::AwaitingSlot => {
                    progressed |= self.try_admit_task(run_id, name);
                    continue;
                }
                _ => continue,
            };

            let waited_ms = since
                .map(|s| self.time.elapsed_since(s).as_millis() as u64)
                .unwrap_or(0);
            let decision = match self.runs.get(&run_id) {
                Some(run) => {
                    ConditionEvaluator::evaluate(node, &run.outcomes, &self.event_keys, waited_ms)
                }
                None => continue,
            };

            match decision {
                Decision::Blocked => {}
                Decision::Run => {
                    if let Some(timer) = state.timer() {
                        self.drop_timer(timer);
                    }
                    self.enter_ready(run_id, node);
                    progressed = true;
                }
                Decision::Skip { reason } => {
                    if let Some(timer) = state.timer() {
                        self.drop_timer(timer);
                    }
                    info!(run_id = %run_id, task = %name, reason = %reason, "Task skipped");
                    self.finish_node(run_id, name, TaskOutcome::Skipped { reason });
                    progressed = true;
                }
                Decision::Wait { remaining_ms } => {
                    let now = self.now();
                    let next = match state {
                        NodeState::Pending => {
                            debug!(run_id = %run_id, task = %name, "Task waiting for event");
                            let timer = remaining_ms.map(|ms| {
                                self.add_timer(
                                    now + to_chrono(Duration::from_millis(ms)),
                                    TimerAction::ConditionWait {
                                        run_id,
                                        task: name.to_string(),
                                    },
                                )
                            });
                            Some(NodeState::Waiting { since: now, timer })
                        }
                        NodeState::Waiting { since, timer: None } => {
                            remaining_ms.map(|ms| NodeState::Waiting {
                                since,
                                timer: Some(self.add_timer(
                                    now + to_chrono(Duration::from_millis(ms)),
                                    TimerAction::ConditionWait {
                                        run_id,
                                        task: name.to_string(),
                                    },
                                )),
                            })
                        }
                        _ => None,
                    };
                    if let (Some(next), Some(run)) = (next, self.runs.get_mut(&run_id)) {
                        run.set_node(name, next);
                    }
                }
            }
        }

        if self.runs.get(&run_id).is_some_and(|r| r.status == RunStatus::Running && r.is_complete()) {
            self.complete_run(run_id);
            progressed = true;
        }
        progressed
    }

    fn enter_ready(&mut self, run_id: Uuid, node: &TaskNode) {
        if node.concurrency.is_empty() {
            if let Some(run) = self.runs.get_mut(&run_id) {
                run.set_node(
                    &node.name,
                    NodeState::Ready {
                        attempt: 1,
                        resumption: None,
                    },
                );
            }
            return;
        }

        let Some((scope, input)) = self
            .runs
            .get(&run_id)
            .map(|r| (format!("{}/{}", r.manifest.name, node.name), r.input.clone()))
        else {
            return;
        };
        self.limiter.enqueue(
            Owner::Task(run_id, node.name.clone()),
            &scope,
            &node.concurrency,
            &input,
        );
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.set_node(&node.name, NodeState::AwaitingSlot);
        }
        self.try_admit_task(run_id, &node.name);
    }

    fn finish_node(&mut self, run_id: Uuid, task: &str, outcome: TaskOutcome) {
        let now = self.now();
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.set_node(task, NodeState::Done);
            run.outcomes.insert(task.to_string(), outcome.clone());
            run.records.push(TaskRecord {
                task: task.to_string(),
                outcome,
                completed_at: now,
            });
        }
        self.limiter.release(&Owner::Task(run_id, task.to_string()));
    }

    fn complete_run(&mut self, run_id: Uuid) {
        let now = self.now();
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.status = RunStatus::Succeeded;
            run.completed_at = Some(now);
            info!(run_id = %run_id, workflow = %run.manifest.name, "Run succeeded");
        }
        self.close_run(run_id);
    }

    fn fail_run(&mut self, run_id: Uuid, task: &str, error: String) {
        self.finish_node(
            run_id,
            task,
            TaskOutcome::Failed {
                error: error.clone(),
            },
        );
        let now = self.now();
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.status = RunStatus::Failed;
            run.completed_at = Some(now);
            run.failure = Some(RunFailure {
                task: task.to_string(),
                error: error.clone(),
            });
        }
        warn!(run_id = %run_id, task = %task, error = %error, "Run failed");
        self.stop_outstanding(run_id, FAILED_RUN_REASON);
        self.close_run(run_id);
    }

    fn cancel_run(&mut self, run_id: Uuid, reason: &str) -> Result<()> {
        let now = self.now();
        let run = self
            .runs
            .get_mut(&run_id)
            .ok_or_else(|| KestrelError::not_found("Run", run_id))?;
        if run.status.is_terminal() {
            return Ok(());
        }
        run.status = RunStatus::Cancelled;
        run.cancel_reason = Some(reason.to_string());
        run.completed_at = Some(now);
        info!(run_id = %run_id, reason = %reason, "Run cancelled");

        self.stop_outstanding(run_id, reason);
        self.close_run(run_id);
        Ok(())
    }

    /// Release everything a terminal run holds and end its streams.
    fn close_run(&mut self, run_id: Uuid) {
        self.limiter.release_run(run_id);
        self.subscribers.remove(&run_id);
    }

    /// Cancel in-flight invocations and drop pending timers of a run.
    fn stop_outstanding(&mut self, run_id: Uuid, reason: &str) {
        let Some(run) = self.runs.get(&run_id) else {
            return;
        };
        let states: Vec<(String, NodeState)> = run
            .nodes
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect();
        let backoff_timers: Vec<String> = run.backoff_timers.values().cloned().collect();

        for timer in backoff_timers {
            self.drop_timer(&timer);
        }

        for (task, state) in states {
            if let Some(timer) = state.timer() {
                self.drop_timer(timer);
            }
            if let NodeState::Running { invocation_id, .. } = state {
                if let Some(invocation) = self.invocations.remove(&invocation_id) {
                    if let Some(connection) = self.workers.get_mut(&invocation.connection) {
                        connection.in_flight.remove(&invocation_id);
                        let _ = connection.sender.send(Ok(WorkerCommand::Cancel {
                            invocation_id,
                            reason: reason.to_string(),
                        }));
                    }
                }
                debug!(run_id = %run_id, task = %task, "In-flight task cancelled");
                let now = self.now();
                if let Some(run) = self.runs.get_mut(&run_id) {
                    run.set_node(&task, NodeState::Done);
                    run.outcomes.insert(task.clone(), TaskOutcome::Cancelled);
                    run.records.push(TaskRecord {
                        task,
                        outcome: TaskOutcome::Cancelled,
                        completed_at: now,
                    });
                }
            }
        }
    }

    // ---- dispatch ----

    fn dispatch(&mut self) {
        let mut ready: Vec<(Reverse<i32>, u64, usize, Uuid, String)> = Vec::new();
        for run in self.runs.values() {
            if run.status != RunStatus::Running {
                continue;
            }
            for (index, name) in run.manifest.graph.topological_order().into_iter().enumerate() {
                if matches!(run.nodes.get(name), Some(NodeState::Ready { .. })) {
                    ready.push((
                        Reverse(run.priority),
                        run.sequence,
                        index,
                        run.id,
                        name.to_string(),
                    ));
                }
            }
        }
        ready.sort();

        for (_, _, _, run_id, task) in ready {
            let Some(workflow) = self.runs.get(&run_id).map(|r| r.manifest.name.clone()) else {
                continue;
            };
            let connection = self
                .workers
                .iter()
                .filter(|(_, w)| w.can_take(&workflow))
                .min_by_key(|(id, w)| (w.in_flight.len(), **id))
                .map(|(id, _)| *id);
            if let Some(connection) = connection {
                self.send_invocation(run_id, &task, connection);
            }
        }
    }

    fn send_invocation(&mut self, run_id: Uuid, task: &str, connection_id: u64) {
        let Some(run) = self.runs.get_mut(&run_id) else {
            return;
        };
        let Some(NodeState::Ready {
            attempt,
            resumption,
        }) = run.node_state(task)
        else {
            return;
        };
        let manifest = Arc::clone(&run.manifest);
        let Some(node) = manifest.graph.node(task) else {
            return;
        };

        let parent_outputs = node
            .parents
            .iter()
            .filter_map(|p| {
                run.outcomes
                    .get(p)
                    .and_then(TaskOutcome::output)
                    .map(|output| (p.clone(), output.clone()))
            })
            .collect();

        let invocation_id = Uuid::new_v4();
        let invocation = TaskInvocation {
            invocation_id,
            run_id,
            workflow: manifest.name.clone(),
            task: task.to_string(),
            attempt,
            input: run.input.clone(),
            parent_outputs,
            resumption: resumption.clone(),
            metadata: run.metadata.clone(),
            timeout_ms: node.timeout_ms,
        };

        let Some(connection) = self.workers.get_mut(&connection_id) else {
            return;
        };
        if connection
            .sender
            .send(Ok(WorkerCommand::Invoke(invocation)))
            .is_err()
        {
            return;
        }
        connection.in_flight.insert(invocation_id);
        info!(
            run_id = %run_id,
            task = %task,
            attempt,
            worker = %connection.name,
            "Task dispatched"
        );

        run.set_node(
            task,
            NodeState::Running {
                invocation_id,
                attempt,
                resumption,
            },
        );
        self.invocations.insert(
            invocation_id,
            InvocationRef {
                run_id,
                task: task.to_string(),
                connection: connection_id,
            },
        );
    }

    /// Forget connections whose worker dropped its command stream.
    fn sweep_workers(&mut self) {
        let closed: Vec<u64> = self
            .workers
            .iter()
            .filter(|(_, w)| w.sender.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for id in closed {
            self.drop_connection(id);
        }
    }

    fn drop_connection(&mut self, connection_id: u64) {
        let Some(connection) = self.workers.remove(&connection_id) else {
            return;
        };
        warn!(
            worker = %connection.name,
            requeued = connection.in_flight.len(),
            "Worker disconnected"
        );
        for invocation_id in connection.in_flight {
            self.requeue(invocation_id);
        }
    }

    /// Put an in-flight invocation back in the ready queue, same attempt.
    fn requeue(&mut self, invocation_id: Uuid) {
        let Some(invocation) = self.invocations.remove(&invocation_id) else {
            return;
        };
        let Some(run) = self.runs.get_mut(&invocation.run_id) else {
            return;
        };
        if run.status != RunStatus::Running {
            return;
        }
        if let Some(NodeState::Running {
            invocation_id: current,
            attempt,
            resumption,
        }) = run.node_state(&invocation.task)
        {
            if current == invocation_id {
                debug!(run_id = %invocation.run_id, task = %invocation.task, "Task requeued");
                run.set_node(
                    &invocation.task,
                    NodeState::Ready {
                        attempt,
                        resumption,
                    },
                );
            }
        }
    }

    // ---- completion ----

    fn complete(&mut self, completion: TaskCompletion) {
        let Some(invocation) = self.invocations.remove(&completion.invocation_id) else {
            debug!(
                invocation_id = %completion.invocation_id,
                task = %completion.task,
                "Ignoring completion for unknown invocation"
            );
            return;
        };
        if let Some(connection) = self.workers.get_mut(&invocation.connection) {
            connection.in_flight.remove(&completion.invocation_id);
        }

        let run_id = invocation.run_id;
        let task = invocation.task;
        let Some(run) = self.runs.get(&run_id) else {
            return;
        };
        if run.status != RunStatus::Running {
            return;
        }
        let Some(NodeState::Running {
            attempt,
            resumption,
            ..
        }) = run.node_state(&task)
        else {
            return;
        };
        let policy = run
            .manifest
            .graph
            .node(&task)
            .map(|n| n.retry.clone())
            .unwrap_or_default();

        match completion.result {
            TaskExecutionResult::Completed { output } => {
                info!(run_id = %run_id, task = %task, attempt, "Task succeeded");
                self.finish_node(run_id, &task, TaskOutcome::Succeeded { output });
            }
            TaskExecutionResult::Suspended(request) => {
                self.suspend(run_id, &task, attempt, request);
            }
            TaskExecutionResult::Cancelled => {
                debug!(run_id = %run_id, task = %task, "Worker gave up the task; requeued");
                if let Some(run) = self.runs.get_mut(&run_id) {
                    run.set_node(
                        &task,
                        NodeState::Ready {
                            attempt,
                            resumption,
                        },
                    );
                }
            }
            result => {
                let error = result
                    .error_text()
                    .unwrap_or_else(|| "Task failed".to_string());
                if should_retry(&policy, attempt, result.can_retry()) {
                    let delay = calculate_backoff(&policy, attempt);
                    info!(
                        run_id = %run_id,
                        task = %task,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying task"
                    );
                    self.schedule_retry(run_id, &task, attempt + 1, resumption, delay);
                } else {
                    self.fail_run(run_id, &task, error);
                }
            }
        }
    }

    fn schedule_retry(
        &mut self,
        run_id: Uuid,
        task: &str,
        attempt: u32,
        resumption: Option<Resumption>,
        delay: Duration,
    ) {
        if delay.is_zero() {
            if let Some(run) = self.runs.get_mut(&run_id) {
                run.set_node(
                    task,
                    NodeState::Ready {
                        attempt,
                        resumption,
                    },
                );
            }
            return;
        }
        let fire_at = self.now() + to_chrono(delay);
        let timer = self.add_timer(
            fire_at,
            TimerAction::Backoff {
                run_id,
                task: task.to_string(),
            },
        );
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.backoff_timers.insert(task.to_string(), timer);
            run.set_node(
                task,
                NodeState::Backoff {
                    attempt,
                    resumption,
                },
            );
        }
    }

    fn suspend(&mut self, run_id: Uuid, task: &str, attempt: u32, request: SuspendRequest) {
        let now = self.now();
        let timer = match &request.suspension {
            Suspension::Sleep { duration_ms } => Some(self.add_timer(
                now + to_chrono(Duration::from_millis(*duration_ms)),
                TimerAction::Resume {
                    run_id,
                    task: task.to_string(),
                    cause: ResumeCause::SleepElapsed,
                },
            )),
            Suspension::WaitForEvent { timeout_ms, .. } => timeout_ms.map(|ms| {
                self.add_timer(
                    now + to_chrono(Duration::from_millis(ms)),
                    TimerAction::Resume {
                        run_id,
                        task: task.to_string(),
                        cause: ResumeCause::WaitTimedOut,
                    },
                )
            }),
        };
        info!(run_id = %run_id, task = %task, step = request.step, "Task suspended");
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.set_node(
                task,
                NodeState::Suspended {
                    attempt,
                    request,
                    timer,
                },
            );
        }
    }

    fn resume(&mut self, run_id: Uuid, task: &str, cause: ResumeCause) {
        if !self.is_running(run_id) {
            return;
        }
        let Some(NodeState::Suspended {
            attempt,
            request,
            timer,
        }) = self.runs.get(&run_id).and_then(|r| r.node_state(task))
        else {
            return;
        };
        if let Some(timer) = timer {
            self.drop_timer(&timer);
        }
        info!(run_id = %run_id, task = %task, step = request.step, "Task resumed");
        if let Some(run) = self.runs.get_mut(&run_id) {
            run.set_node(
                task,
                NodeState::Ready {
                    attempt,
                    resumption: Some(Resumption {
                        step: request.step,
                        checkpoint: request.checkpoint,
                        cause,
                    }),
                },
            );
        }
    }

    // ---- events and timers ----

    fn push_event(&mut self, event_key: &str, payload: Value) {
        self.events.push((event_key.to_string(), payload.clone()));
        self.event_keys.insert(event_key.to_string());
        info!(event_key = %event_key, "Event pushed");

        let waiting: Vec<(Uuid, String)> = self
            .run_order
            .iter()
            .filter_map(|id| self.runs.get(id))
            .filter(|run| run.status == RunStatus::Running)
            .flat_map(|run| {
                run.nodes.iter().filter_map(move |(name, state)| match state {
                    NodeState::Suspended { request, .. } => match &request.suspension {
                        Suspension::WaitForEvent { event_key: key, .. } if key == event_key => {
                            Some((run.id, name.clone()))
                        }
                        _ => None,
                    },
                    _ => None,
                })
            })
            .collect();
        for (run_id, task) in waiting {
            self.resume(
                run_id,
                &task,
                ResumeCause::EventReceived {
                    payload: payload.clone(),
                },
            );
        }

        let mut bound: Vec<String> = self
            .workflows
            .values()
            .filter(|m| m.on_events.iter().any(|k| k == event_key))
            .map(|m| m.name.clone())
            .collect();
        bound.sort();
        for workflow in bound {
            let submitted = self.submit(SubmitRun {
                workflow: workflow.clone(),
                input: payload.clone(),
                options: TriggerOptions::default(),
            });
            if let Err(e) = submitted {
                warn!(workflow = %workflow, error = %e, "Event-triggered run rejected");
            }
        }
    }

    fn fire_timer(&mut self, timer_id: &str) {
        let Some(action) = self.timers.remove(timer_id) else {
            return;
        };
        match action {
            TimerAction::ConditionWait { run_id, task } => {
                if let Some(run) = self.runs.get_mut(&run_id) {
                    if let Some(NodeState::Waiting { since, .. }) = run.node_state(&task) {
                        run.set_node(&task, NodeState::Waiting { since, timer: None });
                    }
                }
            }
            TimerAction::Backoff { run_id, task } => {
                if let Some(run) = self.runs.get_mut(&run_id) {
                    run.backoff_timers.remove(&task);
                    if let Some(NodeState::Backoff {
                        attempt,
                        resumption,
                    }) = run.node_state(&task)
                    {
                        run.set_node(
                            &task,
                            NodeState::Ready {
                                attempt,
                                resumption,
                            },
                        );
                    }
                }
            }
            TimerAction::Resume {
                run_id,
                task,
                cause,
            } => self.resume(run_id, &task, cause),
            TimerAction::Admission => self.admission_wakeup = None,
            TimerAction::Schedule(id) => {
                if let Some(schedule) = self.schedules.remove(&id) {
                    info!(schedule_id = %id, workflow = %schedule.entry.workflow, "Schedule fired");
                    self.trigger(schedule.entry.workflow, schedule.entry.input);
                }
            }
            TimerAction::Cron(id) => {
                let now = self.now();
                let Some(cron) = self.crons.get(&id) else {
                    return;
                };
                let workflow = cron.entry.workflow.clone();
                let input = cron.entry.input.clone();
                let next = cron.schedule.after(&now).next();
                info!(cron_id = %id, workflow = %workflow, "Cron fired");
                let timer = next.map(|at| self.add_timer(at, TimerAction::Cron(id)));
                if let Some(cron) = self.crons.get_mut(&id) {
                    cron.timer = timer;
                }
                self.trigger(workflow, input);
            }
        }
    }

    fn trigger(&mut self, workflow: String, input: Value) {
        let submitted = self.submit(SubmitRun {
            workflow: workflow.clone(),
            input,
            options: TriggerOptions::default(),
        });
        if let Err(e) = submitted {
            warn!(workflow = %workflow, error = %e, "Timed trigger rejected");
        }
    }

    fn fire_due_timers(&mut self) {
        for timer in self.time.take_due() {
            self.fire_timer(&timer);
        }
    }
}

/// In-memory scheduler implementing [`SchedulerTransport`].
///
/// Clones share state, so a test can keep one clone for inspection and hand
/// another to the client.
#[derive(Clone)]
pub struct TestScheduler {
    inner: Arc<Mutex<State>>,
    time: TimeController,
}

impl Default for TestScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::with_time(TimeController::new())
    }

    pub fn with_time(time: TimeController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(State::new(time.clone()))),
            time,
        }
    }

    pub fn time(&self) -> &TimeController {
        &self.time
    }

    /// Current virtual time
    pub fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    pub fn has_workflow(&self, name: &str) -> bool {
        self.inner.lock().workflows.contains_key(name)
    }

    pub fn manifest(&self, name: &str) -> Option<WorkflowManifest> {
        self.inner
            .lock()
            .workflows
            .get(name)
            .map(|m| m.as_ref().clone())
    }

    pub fn snapshot(&self, run_id: Uuid) -> Option<RunSnapshot> {
        self.inner.lock().runs.get(&run_id).map(Run::snapshot)
    }

    /// Runs of `workflow` in submission order
    pub fn runs_of(&self, workflow: &str) -> Vec<Uuid> {
        let state = self.inner.lock();
        state
            .run_order
            .iter()
            .copied()
            .filter(|id| {
                state
                    .runs
                    .get(id)
                    .is_some_and(|r| r.manifest.name == workflow)
            })
            .collect()
    }

    /// Round-robin lane a run was assigned at submission
    pub fn lane_of(&self, run_id: Uuid) -> Option<u32> {
        self.inner.lock().limiter.lane_of(&Owner::Run(run_id))
    }

    pub fn connected_workers(&self) -> Vec<String> {
        let mut state = self.inner.lock();
        state.sweep_workers();
        state.workers.values().map(|w| w.name.clone()).collect()
    }

    /// Invocations dispatched and not yet completed
    pub fn in_flight(&self) -> usize {
        self.inner.lock().invocations.len()
    }

    pub fn event_log(&self) -> Vec<(String, Value)> {
        self.inner.lock().events.clone()
    }

    /// Drop every connection of `worker_name`, requeueing its in-flight work.
    pub fn disconnect_worker(&self, worker_name: &str) -> usize {
        let mut state = self.inner.lock();
        let ids: Vec<u64> = state
            .workers
            .iter()
            .filter(|(_, w)| w.name == worker_name)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            state.drop_connection(*id);
        }
        state.pump();
        ids.len()
    }

    /// Wait until no dispatched invocation is outstanding.
    ///
    /// Work that is ready but has no connected worker does not count.
    pub async fn settle(&self) {
        loop {
            let busy = {
                let mut state = self.inner.lock();
                state.pump();
                !state.invocations.is_empty()
            };
            if !busy {
                return;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }

    /// Advance virtual time, firing timers in chronological order.
    ///
    /// Work dispatched by one timer is allowed to finish before the next
    /// timer fires, so cascades within the window behave as in real time.
    pub async fn advance(&self, duration: Duration) {
        let target = self.time.now() + to_chrono(duration);
        loop {
            self.settle().await;
            let fired = {
                let mut state = self.inner.lock();
                match self.time.advance_to_next_timer(target) {
                    Some(timers) => {
                        for timer in timers {
                            state.fire_timer(&timer);
                        }
                        state.pump();
                        true
                    }
                    None => false,
                }
            };
            if !fired {
                break;
            }
        }
        {
            let mut state = self.inner.lock();
            self.time.set_time(target);
            state.fire_due_timers();
            state.pump();
        }
        self.settle().await;
    }
}

impl std::fmt::Debug for TestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("TestScheduler")
            .field("now", &self.time.now())
            .field("workflows", &state.workflows.len())
            .field("runs", &state.runs.len())
            .field("workers", &state.workers.len())
            .finish()
    }
}

#[async_trait]
impl SchedulerTransport for TestScheduler {
    async fn register_workflow(&self, manifest: &WorkflowManifest) -> Result<()> {
        let mut state = self.inner.lock();
        let previous = state
            .workflows
            .insert(manifest.name.clone(), Arc::new(manifest.clone()));
        match previous {
            Some(old) if old.fingerprint() == manifest.fingerprint() => {
                debug!(workflow = %manifest.name, "Identical workflow re-registered");
            }
            Some(_) => info!(workflow = %manifest.name, "Workflow definition replaced"),
            None => debug!(workflow = %manifest.name, "Workflow registered"),
        }
        state.pump();
        Ok(())
    }

    async fn submit_run(&self, submit: SubmitRun) -> Result<SubmittedRun> {
        let mut state = self.inner.lock();
        let submitted = state.submit(submit)?;
        state.pump();
        Ok(submitted)
    }

    async fn get_run_result(&self, run_id: Uuid) -> Result<RunSnapshot> {
        let mut state = self.inner.lock();
        state.pump();
        state.run(run_id).map(Run::snapshot)
    }

    async fn subscribe_stream(&self, run_id: Uuid) -> Result<ChunkStream> {
        let mut state = self.inner.lock();
        if state.run(run_id)?.status.is_terminal() {
            return Ok(futures::stream::empty::<Result<StreamChunk>>().boxed());
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.subscribers.entry(run_id).or_default().push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn cancel_run(&self, run_id: Uuid, reason: &str) -> Result<()> {
        let mut state = self.inner.lock();
        state.cancel_run(run_id, reason)?;
        state.pump();
        Ok(())
    }

    async fn push_event(&self, event_key: &str, payload: Value) -> Result<()> {
        let mut state = self.inner.lock();
        state.push_event(event_key, payload);
        state.pump();
        Ok(())
    }

    async fn create_schedule(
        &self,
        workflow: &str,
        trigger_at: DateTime<Utc>,
        input: Value,
    ) -> Result<Uuid> {
        let mut state = self.inner.lock();
        if !state.workflows.contains_key(workflow) {
            return Err(KestrelError::not_found("Workflow", workflow));
        }
        if trigger_at <= state.now() {
            return Err(ValidationError::Schedule(format!(
                "trigger time {} is not in the future",
                trigger_at
            ))
            .into());
        }
        let id = Uuid::new_v4();
        let timer = state.add_timer(trigger_at, TimerAction::Schedule(id));
        state.schedules.insert(
            id,
            ScheduleState {
                entry: ScheduleEntry {
                    id,
                    workflow: workflow.to_string(),
                    trigger_at,
                    input,
                },
                timer,
            },
        );
        debug!(schedule_id = %id, workflow = %workflow, trigger_at = %trigger_at, "Schedule created");
        Ok(id)
    }

    async fn delete_schedule(&self, schedule_id: Uuid) -> Result<()> {
        let mut state = self.inner.lock();
        let schedule = state
            .schedules
            .remove(&schedule_id)
            .ok_or_else(|| KestrelError::not_found("Schedule", schedule_id))?;
        state.drop_timer(&schedule.timer);
        Ok(())
    }

    async fn list_schedules(&self, workflow: Option<&str>) -> Result<Vec<ScheduleEntry>> {
        let state = self.inner.lock();
        let mut entries: Vec<ScheduleEntry> = state
            .schedules
            .values()
            .filter(|s| workflow.map_or(true, |w| s.entry.workflow == w))
            .map(|s| s.entry.clone())
            .collect();
        entries.sort_by_key(|e| (e.trigger_at, e.id));
        Ok(entries)
    }

    async fn create_cron(&self, workflow: &str, expression: &str, input: Value) -> Result<Uuid> {
        let mut state = self.inner.lock();
        if !state.workflows.contains_key(workflow) {
            return Err(KestrelError::not_found("Workflow", workflow));
        }
        let normalized = normalize_cron_expression(expression);
        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            ValidationError::CronExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            }
        })?;

        let id = Uuid::new_v4();
        let now = state.now();
        let timer = schedule
            .after(&now)
            .next()
            .map(|at| state.add_timer(at, TimerAction::Cron(id)));
        state.crons.insert(
            id,
            CronState {
                entry: CronEntry {
                    id,
                    workflow: workflow.to_string(),
                    expression: normalized,
                    input,
                },
                schedule,
                timer,
            },
        );
        debug!(cron_id = %id, workflow = %workflow, "Cron created");
        Ok(id)
    }

    async fn delete_cron(&self, cron_id: Uuid) -> Result<()> {
        let mut state = self.inner.lock();
        let cron = state
            .crons
            .remove(&cron_id)
            .ok_or_else(|| KestrelError::not_found("Cron", cron_id))?;
        if let Some(timer) = cron.timer {
            state.drop_timer(&timer);
        }
        Ok(())
    }

    async fn list_crons(&self, workflow: Option<&str>) -> Result<Vec<CronEntry>> {
        let state = self.inner.lock();
        let mut entries: Vec<CronEntry> = state
            .crons
            .values()
            .filter(|c| workflow.map_or(true, |w| c.entry.workflow == w))
            .map(|c| c.entry.clone())
            .collect();
        entries.sort_by(|a, b| (&a.workflow, a.id).cmp(&(&b.workflow, b.id)));
        Ok(entries)
    }

    async fn register_worker(&self, registration: &WorkerRegistration) -> Result<CommandStream> {
        if registration.slots == 0 {
            return Err(ValidationError::Rejected("worker needs at least one slot".to_string()).into());
        }
        let mut state = self.inner.lock();
        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.next_connection;
        state.next_connection += 1;
        state.workers.insert(
            id,
            WorkerConnection {
                name: registration.worker_name.clone(),
                workflows: registration.workflows.iter().cloned().collect(),
                slots: registration.slots as usize,
                sender: tx,
                in_flight: HashSet::new(),
            },
        );
        info!(
            worker = %registration.worker_name,
            slots = registration.slots,
            "Worker connected"
        );
        state.pump();
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn complete_task(&self, completion: TaskCompletion) -> Result<()> {
        let mut state = self.inner.lock();
        state.complete(completion);
        state.pump();
        Ok(())
    }

    async fn publish_chunk(&self, chunk: StreamChunk) -> Result<()> {
        let mut state = self.inner.lock();
        if state.run(chunk.run_id)?.status.is_terminal() {
            return Ok(());
        }
        if let Some(subscribers) = state.subscribers.get_mut(&chunk.run_id) {
            subscribers.retain(|tx| tx.send(Ok(chunk.clone())).is_ok());
        }
        Ok(())
    }
}
