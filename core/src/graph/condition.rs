//! Condition vocabulary attached to task nodes and edges.
//!
//! Conditions are declared by the client at compile time and travel with the
//! graph. The scheduler evaluates them against live event state when a node's
//! parents have all reached a terminal state.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// A guard controlling whether and when a task node executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Satisfied only if the event has been observed.
    RunOnEvent { event_key: String },
    /// Skips the node if the event has been observed. Takes precedence over every other condition.
    SkipOnEvent { event_key: String },
    /// Holds the node until the event is observed. On timeout the node is skipped.
    WaitForEvent {
        event_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Predicate over a parent's output.
    Expression(Predicate),
}

impl Condition {
    pub fn run_on_event(event_key: impl Into<String>) -> Self {
        Self::RunOnEvent {
            event_key: event_key.into(),
        }
    }

    pub fn skip_on_event(event_key: impl Into<String>) -> Self {
        Self::SkipOnEvent {
            event_key: event_key.into(),
        }
    }

    /// Wait for an event with no deadline.
    pub fn wait_for_event(event_key: impl Into<String>) -> Self {
        Self::WaitForEvent {
            event_key: event_key.into(),
            timeout_ms: None,
        }
    }

    /// Wait for an event, skipping the node once `timeout` elapses.
    pub fn wait_for_event_with_timeout(event_key: impl Into<String>, timeout: Duration) -> Self {
        Self::WaitForEvent {
            event_key: event_key.into(),
            timeout_ms: Some(timeout.as_millis() as u64),
        }
    }

    pub fn expression(predicate: Predicate) -> Self {
        Self::Expression(predicate)
    }

    /// The event key this condition listens for, if any.
    pub fn event_key(&self) -> Option<&str> {
        match self {
            Self::RunOnEvent { event_key }
            | Self::SkipOnEvent { event_key }
            | Self::WaitForEvent { event_key, .. } => Some(event_key),
            Self::Expression(_) => None,
        }
    }
}

/// How multiple conditions on one node combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Every condition must hold (AND).
    #[default]
    All,
    /// One satisfied condition is enough (OR group).
    Any,
}

/// The conditions gating a node plus their combination mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            mode: MatchMode::All,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            mode: MatchMode::Any,
            conditions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }
}

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// The pointer resolves to a non-null value.
    Exists,
    /// The pointer resolves to a value other than null, false, 0, "", [] or {}.
    Truthy,
}

/// A check against the output of one parent task.
///
/// `pointer` is an RFC 6901 JSON pointer into the parent's output; an empty
/// pointer addresses the whole output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub task: String,
    #[serde(default)]
    pub pointer: String,
    pub op: CompareOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Predicate {
    pub fn new(
        task: impl Into<String>,
        pointer: impl Into<String>,
        op: CompareOp,
        value: Option<Value>,
    ) -> Self {
        Self {
            task: task.into(),
            pointer: pointer.into(),
            op,
            value,
        }
    }

    pub fn eq(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Eq, Some(value))
    }

    pub fn ne(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Ne, Some(value))
    }

    pub fn gt(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Gt, Some(value))
    }

    pub fn gte(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Gte, Some(value))
    }

    pub fn lt(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Lt, Some(value))
    }

    pub fn lte(task: impl Into<String>, pointer: impl Into<String>, value: Value) -> Self {
        Self::new(task, pointer, CompareOp::Lte, Some(value))
    }

    pub fn exists(task: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::new(task, pointer, CompareOp::Exists, None)
    }

    pub fn truthy(task: impl Into<String>, pointer: impl Into<String>) -> Self {
        Self::new(task, pointer, CompareOp::Truthy, None)
    }

    /// Evaluate against the parent's output. A missing output is treated as null.
    pub fn evaluate(&self, output: Option<&Value>) -> bool {
        let target = output.and_then(|o| {
            if self.pointer.is_empty() {
                Some(o)
            } else {
                o.pointer(&self.pointer)
            }
        });

        match self.op {
            CompareOp::Exists => target.is_some_and(|v| !v.is_null()),
            CompareOp::Truthy => target.is_some_and(is_truthy),
            CompareOp::Eq => target == self.value.as_ref(),
            CompareOp::Ne => target != self.value.as_ref(),
            CompareOp::Gt => compare(target, self.value.as_ref()).is_some_and(|o| o.is_gt()),
            CompareOp::Gte => compare(target, self.value.as_ref()).is_some_and(|o| o.is_ge()),
            CompareOp::Lt => compare(target, self.value.as_ref()).is_some_and(|o| o.is_lt()),
            CompareOp::Lte => compare(target, self.value.as_ref()).is_some_and(|o| o.is_le()),
        }
    }

    /// Operators other than `Exists` and `Truthy` need a comparison value.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.pointer.is_empty() && !self.pointer.starts_with('/') {
            return Err(format!(
                "pointer '{}' must be empty or start with '/'",
                self.pointer
            ));
        }
        match self.op {
            CompareOp::Exists | CompareOp::Truthy => Ok(()),
            _ if self.value.is_none() => Err(format!("operator {:?} requires a value", self.op)),
            _ => Ok(()),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Orders numbers numerically and strings lexically; anything else is incomparable.
fn compare(left: Option<&Value>, right: Option<&Value>) -> Option<std::cmp::Ordering> {
    match (left?, right?) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
