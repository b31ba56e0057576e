//! WorkflowRegistry - workflows known to this process

use crate::task::registry::RegisteredTask;
use crate::workflow::definition::Workflow;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Workflows registered through a client, by name.
///
/// Registering a name again replaces the previous definition, matching the
/// scheduler's idempotent re-registration.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<String, Arc<Workflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous definition
    pub fn register(&self, workflow: Workflow) -> Option<Arc<Workflow>> {
        let name = workflow.name().to_string();
        self.workflows.write().insert(name, Arc::new(workflow))
    }

    pub fn get(&self, name: &str) -> Option<Arc<Workflow>> {
        self.workflows.read().get(name).cloned()
    }

    /// Resolve the body of `task` in `workflow`
    pub fn task(&self, workflow: &str, task: &str) -> Option<Arc<RegisteredTask>> {
        self.get(workflow).and_then(|w| w.task(task))
    }

    pub fn has(&self, name: &str) -> bool {
        self.workflows.read().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.workflows.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.workflows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.read().is_empty()
    }
}

impl std::fmt::Debug for WorkflowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRegistry")
            .field("workflows", &self.names())
            .finish()
    }
}
