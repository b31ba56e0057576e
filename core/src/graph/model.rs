//! Task nodes, edges and the compiled graph sent to the scheduler.

use super::concurrency::ConcurrencyGroup;
use super::condition::{Condition, ConditionSet};
use crate::task::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// How a node reacts to the outcomes of its parents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentRule {
    /// Run only if every parent succeeded; a skipped parent skips this node.
    #[default]
    AllSucceeded,
    /// Run if at least one parent succeeded.
    AnySucceeded,
}

/// One task within a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskNode {
    /// Unique within the workflow
    pub name: String,
    /// Direct dependencies, filled in by the compiler
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concurrency: Vec<ConcurrencyGroup>,
    #[serde(default)]
    pub conditions: ConditionSet,
    #[serde(default)]
    pub parent_rule: ParentRule,
}

impl TaskNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            input_schema: None,
            output_schema: None,
            retry: RetryPolicy::default(),
            timeout_ms: None,
            concurrency: Vec::new(),
            conditions: ConditionSet::default(),
            parent_rule: ParentRule::default(),
        }
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_concurrency(mut self, group: ConcurrencyGroup) -> Self {
        self.concurrency.push(group);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_parent_rule(mut self, rule: ParentRule) -> Self {
        self.parent_rule = rule;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// A dependency `from -> to`, optionally guarded.
///
/// An edge condition is added to the conditions of the downstream node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: None,
        }
    }

    pub fn guarded(from: impl Into<String>, to: impl Into<String>, condition: Condition) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            condition: Some(condition),
        }
    }
}

/// Immutable, validated graph. Nodes are stored in topological order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledGraph {
    pub(crate) nodes: Vec<TaskNode>,
}

impl CompiledGraph {
    /// Nodes in topological order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn topological_order(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    /// Nodes without parents.
    pub fn roots(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().filter(|n| n.parents.is_empty())
    }

    /// Nodes that list `name` as a direct parent.
    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TaskNode> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.parents.iter().any(|p| p == name))
    }

    /// SHA-256 over the canonical JSON form, hex encoded.
    pub fn fingerprint(&self) -> String {
        // serde_json maps are ordered, so the encoding is stable.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        Sha256::digest(&bytes)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

/// Everything the scheduler needs to know about a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    pub graph: CompiledGraph,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concurrency: Vec<ConcurrencyGroup>,
    /// Event keys that start a run of this workflow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_events: Vec<String>,
}

impl WorkflowManifest {
    pub fn new(name: impl Into<String>, graph: CompiledGraph) -> Self {
        Self {
            name: name.into(),
            input_schema: None,
            graph,
            concurrency: Vec::new(),
            on_events: Vec::new(),
        }
    }

    pub fn with_input_schema(mut self, schema: Option<Value>) -> Self {
        self.input_schema = schema;
        self
    }

    pub fn with_concurrency(mut self, groups: Vec<ConcurrencyGroup>) -> Self {
        self.concurrency = groups;
        self
    }

    pub fn with_on_events(mut self, keys: Vec<String>) -> Self {
        self.on_events = keys;
        self
    }

    /// Fingerprint of the whole manifest, used to recognise identical re-registrations.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        Sha256::digest(&bytes)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
