//! Workflow definitions and the graph builder

use crate::error::{KestrelError, Result, ValidationError};
use crate::task::context::TaskContext;
use crate::task::definition::TaskDefinition;
use crate::task::registry::{schema_of, BoxedTaskFn, RegisteredTask, TaskMetadata, TaskRegistry};
use kestrel_core::{
    compile, CompiledGraph, ConcurrencyGroup, Edge, GraphError, TaskNode, WorkflowManifest,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Checks a raw run input against the workflow's declared input type
type InputValidator = Box<dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync>;

/// A compiled workflow: its manifest plus the task bodies a worker runs.
///
/// Built with [`Workflow::builder`]:
///
/// ```rust,ignore
/// let workflow = Workflow::builder("checkout")
///     .input_type::<Order>()
///     .task(Reserve)
///     .task_with(Charge, |node| node.depends_on("reserve"))
///     .task_with(Notify, |node| {
///         node.depends_on("charge")
///             .with_condition(Condition::skip_on_event("notifications.paused"))
///     })
///     .build()?;
/// ```
pub struct Workflow {
    manifest: WorkflowManifest,
    tasks: TaskRegistry,
    description: Option<String>,
    input_validator: Option<InputValidator>,
}

impl Workflow {
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// A single-node workflow named after `task`, taking the task's input type.
    pub fn from_task<T>(task: T) -> Result<Self>
    where
        T: TaskDefinition + 'static,
        T::Input: 'static,
    {
        let name = task.name().to_string();
        Self::builder(name).input_type::<T::Input>().task(task).build()
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// What gets registered with the scheduler
    pub fn manifest(&self) -> &WorkflowManifest {
        &self.manifest
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.manifest.graph
    }

    pub fn task(&self, name: &str) -> Option<Arc<RegisteredTask>> {
        self.tasks.get(name)
    }

    /// Check `input` against the declared input type, locally.
    pub fn validate_input(&self, input: &Value) -> Result<()> {
        match &self.input_validator {
            Some(validate) => validate(input).map_err(|reason| {
                ValidationError::Input {
                    workflow: self.name().to_string(),
                    reason,
                }
                .into()
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.manifest.name)
            .field("tasks", &self.manifest.graph.topological_order())
            .field("on_events", &self.manifest.on_events)
            .field("typed_input", &self.input_validator.is_some())
            .finish()
    }
}

/// Builder for [`Workflow`]. Errors are collected and reported by `build`.
pub struct WorkflowBuilder {
    name: String,
    description: Option<String>,
    input_schema: Option<Value>,
    input_validator: Option<InputValidator>,
    tasks: Vec<(RegisteredTask, TaskNode)>,
    edges: Vec<Edge>,
    concurrency: Vec<ConcurrencyGroup>,
    on_events: Vec<String>,
    error: Option<KestrelError>,
}

impl WorkflowBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
            input_validator: None,
            tasks: Vec::new(),
            edges: Vec::new(),
            concurrency: Vec::new(),
            on_events: Vec::new(),
            error: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare the run input type. Inputs that do not deserialize as `I` are
    /// rejected before submission.
    pub fn input_type<I>(mut self) -> Self
    where
        I: DeserializeOwned + JsonSchema + 'static,
    {
        match schema_of::<I>() {
            Ok(schema) => self.input_schema = Some(schema),
            Err(e) => self.record_error(e),
        }
        self.input_validator = Some(Box::new(|input: &Value| {
            serde_json::from_value::<I>(input.clone())
                .map(|_| ())
                .map_err(|e| e.to_string())
        }));
        self
    }

    /// Add a task with no dependencies beyond what it declares itself
    pub fn task<T>(self, task: T) -> Self
    where
        T: TaskDefinition + 'static,
    {
        self.task_with(task, |node| node)
    }

    /// Add a task and adjust its graph node (dependencies, conditions, ...)
    pub fn task_with<T, F>(mut self, task: T, configure: F) -> Self
    where
        T: TaskDefinition + 'static,
        F: FnOnce(TaskNode) -> TaskNode,
    {
        match RegisteredTask::from_definition(task) {
            Ok(registered) => {
                let node = configure(registered.metadata.to_node());
                self.tasks.push((registered, node));
            }
            Err(e) => self.record_error(e),
        }
        self
    }

    /// Add an untyped task from a closure
    pub fn task_fn<F, Fut>(self, name: &str, execute_fn: F) -> Self
    where
        F: Fn(Arc<dyn TaskContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.task_fn_with(name, execute_fn, |node| node)
    }

    /// Add an untyped task from a closure and adjust its graph node
    pub fn task_fn_with<F, Fut, C>(mut self, name: &str, execute_fn: F, configure: C) -> Self
    where
        F: Fn(Arc<dyn TaskContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
        C: FnOnce(TaskNode) -> TaskNode,
    {
        let boxed: BoxedTaskFn = Box::new(move |ctx, input| Box::pin(execute_fn(ctx, input)));
        let node = configure(TaskNode::new(name));
        let mut metadata = TaskMetadata::named(name);
        metadata.retry = node.retry.clone();
        metadata.timeout = node.timeout();
        self.tasks.push((RegisteredTask::new(metadata, boxed), node));
        self
    }

    /// Add a dependency edge, optionally guarded by a condition
    pub fn edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Workflow-level concurrency group, gating run admission
    pub fn concurrency(mut self, group: ConcurrencyGroup) -> Self {
        self.concurrency.push(group);
        self
    }

    /// Start a run whenever `event_key` is pushed, with the payload as input
    pub fn on_event(mut self, event_key: impl Into<String>) -> Self {
        self.on_events.push(event_key.into());
        self
    }

    fn record_error(&mut self, error: KestrelError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Compile the graph and validate every declaration.
    pub fn build(self) -> Result<Workflow> {
        if let Some(error) = self.error {
            return Err(error);
        }

        for group in &self.concurrency {
            group
                .validate()
                .map_err(|reason| GraphError::InvalidConcurrency {
                    scope: self.name.clone(),
                    reason,
                })?;
        }
        if let Some(key) = self.on_events.iter().find(|k| k.trim().is_empty()) {
            return Err(GraphError::InvalidCondition {
                task: self.name.clone(),
                reason: format!("event binding '{}' is empty", key),
            }
            .into());
        }

        let tasks = TaskRegistry::new();
        let mut nodes = Vec::with_capacity(self.tasks.len());
        for (registered, node) in self.tasks {
            // Workers look bodies up by node name.
            if node.name != registered.metadata.name {
                return Err(GraphError::RenamedTask {
                    task: registered.metadata.name,
                    node: node.name,
                }
                .into());
            }
            tasks.register_raw(registered)?;
            nodes.push(node);
        }

        let graph = compile(nodes, self.edges)?;
        let manifest = WorkflowManifest::new(self.name, graph)
            .with_input_schema(self.input_schema)
            .with_concurrency(self.concurrency)
            .with_on_events(self.on_events);

        Ok(Workflow {
            manifest,
            tasks,
            description: self.description,
            input_validator: self.input_validator,
        })
    }
}

/// Dependency helpers for configuring a [`TaskNode`] inside `task_with`.
pub trait NodeExt {
    fn depends_on(self, parent: impl Into<String>) -> Self;
    fn depends_on_all<I, S>(self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
}

impl NodeExt for TaskNode {
    fn depends_on(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    fn depends_on_all<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents.extend(parents.into_iter().map(Into::into));
        self
    }
}
