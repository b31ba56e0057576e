//! TaskDefinition trait

use crate::error::Result;
use crate::task::context::TaskContext;
use async_trait::async_trait;
use kestrel_core::{ConcurrencyGroup, ConditionSet, ParentRule, RetryPolicy};
use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Definition of a task with typed input and output.
///
/// A task receives the run input (deserialized as [`Self::Input`]) and reads
/// its parents' outputs through the context. The dispatch policy methods
/// (retry, timeout, concurrency, conditions) are declared here once and
/// travel with the compiled graph; the scheduler enforces them.
#[async_trait]
pub trait TaskDefinition: Send + Sync {
    /// Input type for the task
    type Input: Serialize + DeserializeOwned + JsonSchema + Send;
    /// Output type for the task
    type Output: Serialize + DeserializeOwned + JsonSchema + Send;

    /// Name of the task, unique within a workflow
    fn name(&self) -> &str;

    /// Execute the task with the given input and context
    async fn execute(&self, input: Self::Input, ctx: &dyn TaskContext) -> Result<Self::Output>;

    /// Optional description of the task
    fn description(&self) -> Option<&str> {
        None
    }

    /// Retry policy applied by the scheduler (default: a single attempt)
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::none()
    }

    /// Execution timeout (None = the worker's default)
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Concurrency groups gating this task's dispatch
    fn concurrency(&self) -> Vec<ConcurrencyGroup> {
        vec![]
    }

    /// Conditions gating this task's dispatch
    fn conditions(&self) -> ConditionSet {
        ConditionSet::default()
    }

    /// How parent outcomes gate this task
    fn parent_rule(&self) -> ParentRule {
        ParentRule::default()
    }
}

/// Type alias for dynamic task input/output
pub type DynamicTaskInput = Map<String, Value>;
pub type DynamicTaskOutput = Map<String, Value>;

/// Helper trait for implementing tasks over untyped JSON objects
#[async_trait]
pub trait DynamicTask: Send + Sync {
    fn name(&self) -> &str;

    /// Execute the task with dynamic input/output
    async fn execute(
        &self,
        input: DynamicTaskInput,
        ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput>;

    fn description(&self) -> Option<&str> {
        None
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::none()
    }

    fn timeout(&self) -> Option<Duration> {
        None
    }

    fn concurrency(&self) -> Vec<ConcurrencyGroup> {
        vec![]
    }

    fn conditions(&self) -> ConditionSet {
        ConditionSet::default()
    }

    fn parent_rule(&self) -> ParentRule {
        ParentRule::default()
    }
}

// Implement TaskDefinition for any DynamicTask
#[async_trait]
impl<T: DynamicTask> TaskDefinition for T {
    type Input = DynamicTaskInput;
    type Output = DynamicTaskOutput;

    fn name(&self) -> &str {
        DynamicTask::name(self)
    }

    async fn execute(&self, input: Self::Input, ctx: &dyn TaskContext) -> Result<Self::Output> {
        DynamicTask::execute(self, input, ctx).await
    }

    fn description(&self) -> Option<&str> {
        DynamicTask::description(self)
    }

    fn retry_policy(&self) -> RetryPolicy {
        DynamicTask::retry_policy(self)
    }

    fn timeout(&self) -> Option<Duration> {
        DynamicTask::timeout(self)
    }

    fn concurrency(&self) -> Vec<ConcurrencyGroup> {
        DynamicTask::concurrency(self)
    }

    fn conditions(&self) -> ConditionSet {
        DynamicTask::conditions(self)
    }

    fn parent_rule(&self) -> ParentRule {
        DynamicTask::parent_rule(self)
    }
}
