//! # Kestrel Core
//!
//! Language-agnostic core of the Kestrel workflow orchestration client.
//!
//! **Core** contains the pieces every language binding shares:
//! - Protocol buffer definitions and the generated scheduler client
//! - The workflow graph model and its compiler
//! - The condition vocabulary and the reference evaluator
//! - Concurrency group declarations
//! - Run, task-result and stream chunk types
//! - Durable suspension and worker command types
//! - Retry backoff and reconnection strategies
//!
//! **SDK** crates build the language-specific programming model on top:
//! typed task and workflow definitions, the client, run handles and workers.
//!
//! ## Modules
//!
//! - [`generated`] - gRPC/protobuf generated code
//! - [`graph`] - Graph model, compiler, conditions and concurrency groups
//! - [`task`] - Retry policy, execution results and stream chunks
//! - [`run`] - Run status and per-task results
//! - [`durable`] - Durable sleep and wait types
//! - [`trigger`] - Run submissions, schedules and crons
//! - [`worker`] - Worker commands and reconnection
//! - [`client`] - gRPC client wrapper for the scheduler
//! - [`error`] - Core error types

pub mod client;
pub mod durable;
pub mod error;
pub mod generated;
pub mod graph;
pub mod run;
pub mod task;
pub mod trigger;
pub mod worker;

pub use error::{CoreError, CoreResult};

pub use graph::{
    compile, CompiledGraph, Condition, ConditionEvaluator, ConditionSet, ConcurrencyGroup,
    ConcurrencyStrategy, Decision, Edge, GraphError, KeyExpression, MatchMode, ParentRule,
    Predicate, TaskNode, WorkflowManifest,
};

pub use task::{
    calculate_backoff, should_retry, Backoff, ChunkContent, ChunkKind, RetryPolicy, StreamChunk,
    TaskExecutionResult,
};

pub use run::{RunFailure, RunSnapshot, RunStatus, TaskOutcome, TaskRecord};

pub use durable::{ResumeCause, Resumption, SuspendRequest, Suspension};

pub use trigger::{CronEntry, ScheduleEntry, SubmitRun, SubmittedRun, TriggerOptions};

pub use worker::{
    ReconnectionStrategy, Reconnector, TaskCompletion, TaskInvocation, WorkerCommand,
    WorkerRegistration,
};

pub use client::{AuthInterceptor, ChunkStream, CommandStream, Scheduler};
