//! Named task implementations a worker can serve, with the policies each declares

use crate::error::{KestrelError, Result};
use crate::task::context::TaskContext;
use crate::task::definition::TaskDefinition;
use kestrel_core::{ConcurrencyGroup, ConditionSet, ParentRule, RetryPolicy, TaskNode};
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Task metadata extracted from a task definition
#[derive(Debug, Clone)]
pub struct TaskMetadata {
    pub name: String,
    pub description: Option<String>,
    pub retry: RetryPolicy,
    pub timeout: Option<Duration>,
    pub concurrency: Vec<ConcurrencyGroup>,
    pub conditions: ConditionSet,
    pub parent_rule: ParentRule,
    /// JSON schema of the input type
    pub input_schema: Option<Value>,
    /// JSON schema of the output type
    pub output_schema: Option<Value>,
}

impl TaskMetadata {
    /// Metadata with default policies and no schemas
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            retry: RetryPolicy::none(),
            timeout: None,
            concurrency: vec![],
            conditions: ConditionSet::default(),
            parent_rule: ParentRule::default(),
            input_schema: None,
            output_schema: None,
        }
    }

    /// The graph node this task compiles to, before dependencies are added
    pub fn to_node(&self) -> TaskNode {
        let mut node = TaskNode::new(&self.name)
            .with_retry(self.retry.clone())
            .with_conditions(self.conditions.clone())
            .with_parent_rule(self.parent_rule);
        if let Some(timeout) = self.timeout {
            node = node.with_timeout(timeout);
        }
        if let Some(schema) = &self.input_schema {
            node = node.with_input_schema(schema.clone());
        }
        if let Some(schema) = &self.output_schema {
            node = node.with_output_schema(schema.clone());
        }
        for group in &self.concurrency {
            node = node.with_concurrency(group.clone());
        }
        node
    }
}

/// JSON schema for `T`
pub(crate) fn schema_of<T: JsonSchema>() -> Result<Value> {
    Ok(serde_json::to_value(schemars::schema_for!(T))?)
}

/// Type-erased task body: JSON in, JSON out
pub type BoxedTaskFn = Box<
    dyn Fn(Arc<dyn TaskContext>, Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// A registered task with its metadata and execution function
pub struct RegisteredTask {
    pub metadata: TaskMetadata,
    execute_fn: BoxedTaskFn,
}

impl RegisteredTask {
    pub fn new(metadata: TaskMetadata, execute_fn: BoxedTaskFn) -> Self {
        Self {
            metadata,
            execute_fn,
        }
    }

    /// Erase a typed task definition
    pub fn from_definition<T>(task: T) -> Result<Self>
    where
        T: TaskDefinition + 'static,
    {
        let metadata = TaskMetadata {
            name: task.name().to_string(),
            description: task.description().map(str::to_string),
            retry: task.retry_policy(),
            timeout: task.timeout(),
            concurrency: task.concurrency(),
            conditions: task.conditions(),
            parent_rule: task.parent_rule(),
            input_schema: Some(schema_of::<T::Input>()?),
            output_schema: Some(schema_of::<T::Output>()?),
        };

        let task = Arc::new(task);
        let execute_fn: BoxedTaskFn = Box::new(move |ctx, input| {
            let task = Arc::clone(&task);
            Box::pin(async move {
                let typed_input: T::Input = serde_json::from_value(input).map_err(|e| {
                    KestrelError::NonRetryable(format!("Invalid task input: {}", e))
                })?;
                let output = task.execute(typed_input, ctx.as_ref()).await?;
                Ok(serde_json::to_value(output)?)
            })
        });

        Ok(Self::new(metadata, execute_fn))
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Execute the task
    pub async fn execute(&self, ctx: Arc<dyn TaskContext>, input: Value) -> Result<Value> {
        (self.execute_fn)(ctx, input).await
    }
}

impl std::fmt::Debug for RegisteredTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTask")
            .field("metadata", &self.metadata)
            .field("execute_fn", &"<function>")
            .finish()
    }
}

/// Tasks of one workflow, by name.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, Arc<RegisteredTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task with metadata and execution function
    pub fn register_raw(&self, task: RegisteredTask) -> Result<()> {
        let name = task.metadata.name.clone();
        let mut tasks = self.tasks.write();

        if tasks.contains_key(&name) {
            return Err(KestrelError::Validation(
                kestrel_core::GraphError::DuplicateTask(name).into(),
            ));
        }

        tasks.insert(name, Arc::new(task));
        Ok(())
    }

    /// Register a task definition
    pub fn register<T>(&self, task: T) -> Result<()>
    where
        T: TaskDefinition + 'static,
    {
        self.register_raw(RegisteredTask::from_definition(task)?)
    }

    /// Register a task from a name and an untyped function
    pub fn register_simple<F, Fut>(&self, name: &str, execute_fn: F) -> Result<()>
    where
        F: Fn(Arc<dyn TaskContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let boxed_fn: BoxedTaskFn = Box::new(move |ctx, input| Box::pin(execute_fn(ctx, input)));
        self.register_raw(RegisteredTask::new(TaskMetadata::named(name), boxed_fn))
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredTask>> {
        self.tasks.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.tasks.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tasks.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.names())
            .finish()
    }
}
