//! Kestrel SDK for Rust
//!
//! Define workflows as graphs of tasks, run them on a Kestrel scheduler,
//! execute their tasks in a worker, and follow runs through result handles
//! and live chunk streams. Transport to the scheduler is gRPC.

#![allow(clippy::result_large_err)]

pub mod client;
pub mod config;
pub mod error;
pub mod task;
pub mod worker;
pub mod workflow;

/// Testing utilities: in-memory scheduler, controllable time, mocks.
/// Available only with the `testing` feature enabled.
#[cfg(feature = "testing")]
pub mod testing;

pub use error::{KestrelError, Result, ValidationError};

// Re-export config types
pub use config::{ConfigError, KestrelClientConfig, TlsStrategy, WorkerSettings};

// Re-export client types
pub use client::{
    KestrelClient, KestrelClientBuilder, RunHandle, RunOptions, RunOutput, RunState, RunStream,
    SchedulerTransport,
};

// Re-export workflow and task types
pub use task::{
    DynamicTask, RegisteredTask, TaskContext, TaskContextExt, TaskDefinition, TaskMetadata,
    TaskRegistry,
};
pub use worker::WorkerHandle;
pub use workflow::{NodeExt, Workflow, WorkflowBuilder, WorkflowRegistry};

// Re-export the graph vocabulary from core
pub use kestrel_core::{
    Backoff, ChunkContent, ChunkKind, ConcurrencyGroup, ConcurrencyStrategy, Condition,
    ConditionSet, Edge, KeyExpression, MatchMode, ParentRule, Predicate, ReconnectionStrategy,
    ResumeCause, Resumption, RetryPolicy, RunSnapshot, RunStatus, StreamChunk, TaskNode,
    TaskOutcome, TaskRecord,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::{KestrelClient, RunHandle, RunOptions, RunOutput, RunStream};
    pub use crate::config::{KestrelClientConfig, TlsStrategy, WorkerSettings};
    pub use crate::error::{KestrelError, Result, ValidationError};
    pub use crate::task::{DynamicTask, TaskContext, TaskContextExt, TaskDefinition};
    pub use crate::workflow::{NodeExt, Workflow};
    pub use async_trait::async_trait;
    pub use kestrel_core::{
        Backoff, ChunkContent, ConcurrencyGroup, Condition, Edge, KeyExpression, ParentRule,
        RetryPolicy, RunStatus, TaskOutcome,
    };
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
    pub use uuid::Uuid;
}
