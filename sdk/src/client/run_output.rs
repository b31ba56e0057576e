//! Result map of a succeeded run

use crate::error::{KestrelError, Result};
use chrono::{DateTime, Utc};
use kestrel_core::{RunSnapshot, TaskOutcome, TaskRecord};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Per-task results of a succeeded run, in completion order.
///
/// Skipped tasks appear as [`TaskOutcome::Skipped`]; tasks that were never
/// dispatched do not appear at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    run_id: Uuid,
    workflow: String,
    records: Vec<TaskRecord>,
    metadata: HashMap<String, String>,
    completed_at: Option<DateTime<Utc>>,
}

impl RunOutput {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn workflow(&self) -> &str {
        &self.workflow
    }

    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Record of `task`, if it reached a terminal state
    pub fn get(&self, task: &str) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.task == task)
    }

    pub fn contains(&self, task: &str) -> bool {
        self.get(task).is_some()
    }

    /// Raw output of a succeeded task
    pub fn value(&self, task: &str) -> Option<&Value> {
        self.get(task).and_then(|r| r.outcome.output())
    }

    /// Deserialized output of a succeeded task
    pub fn output<T: DeserializeOwned>(&self, task: &str) -> Result<T> {
        match self.get(task).map(|r| &r.outcome) {
            Some(TaskOutcome::Succeeded { output }) => Ok(serde_json::from_value(output.clone())?),
            Some(TaskOutcome::Skipped { reason }) => Err(KestrelError::Other(format!(
                "Task '{}' was skipped: {}",
                task, reason
            ))),
            Some(other) => Err(KestrelError::Other(format!(
                "Task '{}' has no output ({:?})",
                task, other
            ))),
            None => Err(KestrelError::not_found("Task result", task)),
        }
    }

    pub fn is_skipped(&self, task: &str) -> bool {
        self.get(task).is_some_and(|r| r.outcome.is_skipped())
    }

    /// Task names in completion order
    pub fn tasks(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.task.as_str()).collect()
    }

    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Outcomes keyed by task name, without timestamps
    pub fn outcomes(&self) -> BTreeMap<&str, &TaskOutcome> {
        self.records
            .iter()
            .map(|r| (r.task.as_str(), &r.outcome))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<RunSnapshot> for RunOutput {
    fn from(snapshot: RunSnapshot) -> Self {
        Self {
            run_id: snapshot.run_id,
            workflow: snapshot.workflow,
            records: snapshot.records,
            metadata: snapshot.metadata,
            completed_at: snapshot.completed_at,
        }
    }
}
