//! Worker registration and the commands the scheduler streams to a worker.

use crate::durable::Resumption;
use crate::task::TaskExecutionResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// What a worker announces when it opens its command stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRegistration {
    pub worker_name: String,
    /// Workflows whose tasks this worker can execute
    pub workflows: Vec<String>,
    /// Maximum invocations executed concurrently
    pub slots: u32,
}

/// One dispatched execution of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInvocation {
    pub invocation_id: Uuid,
    pub run_id: Uuid,
    pub workflow: String,
    pub task: String,
    /// 1-based; a resumed invocation keeps the attempt it suspended in
    pub attempt: u32,
    pub input: Value,
    /// Outputs of parents that succeeded
    #[serde(default)]
    pub parent_outputs: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resumption: Option<Resumption>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Message on a worker's command stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorkerCommand {
    Invoke(TaskInvocation),
    Cancel { invocation_id: Uuid, reason: String },
}

/// A worker's report on an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub invocation_id: Uuid,
    pub run_id: Uuid,
    pub task: String,
    pub result: TaskExecutionResult,
}
