//! Graph compilation.
//!
//! Rules enforced:
//! 1. A workflow has at least one task.
//! 2. Task names are unique.
//! 3. Every edge endpoint names a task in the same workflow.
//! 4. The dependency relation is acyclic (Kahn's algorithm must visit every node).
//! 5. Conditions and concurrency groups are well formed, and expressions only
//!    reference direct parents of the node they guard.

use super::model::{CompiledGraph, Edge, TaskNode};
use std::collections::{HashMap, HashSet, VecDeque};

/// Why a graph failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Workflow has no tasks")]
    EmptyWorkflow,

    #[error("Duplicate task name: {0}")]
    DuplicateTask(String),

    #[error("Edge references unknown task '{task}' on its {side} side")]
    UnknownTask { task: String, side: &'static str },

    #[error("Cycle detected: {}", cycle.join(" -> "))]
    CycleDetected {
        /// Nodes on one cycle, in edge order. The first node is repeated at the end.
        cycle: Vec<String>,
    },

    #[error("Invalid condition on task '{task}': {reason}")]
    InvalidCondition { task: String, reason: String },

    #[error("Invalid concurrency group on '{scope}': {reason}")]
    InvalidConcurrency { scope: String, reason: String },

    #[error("Task '{task}' is bound to a node named '{node}'")]
    RenamedTask { task: String, node: String },
}

/// Validate `tasks` and `edges` and produce an immutable graph.
///
/// Parents already listed on a node are treated as edges. Edge conditions are
/// appended to the downstream node's conditions. Nodes come out in topological
/// order, ties broken by declaration order.
pub fn compile(tasks: Vec<TaskNode>, edges: Vec<Edge>) -> Result<CompiledGraph, GraphError> {
    if tasks.is_empty() {
        return Err(GraphError::EmptyWorkflow);
    }

    let mut index: HashMap<String, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if index.insert(task.name.clone(), i).is_some() {
            return Err(GraphError::DuplicateTask(task.name.clone()));
        }
    }

    let mut all_edges: Vec<Edge> = tasks
        .iter()
        .flat_map(|t| t.parents.iter().map(|p| Edge::new(p.clone(), t.name.clone())))
        .collect();
    all_edges.extend(edges);

    for edge in &all_edges {
        if !index.contains_key(&edge.from) {
            return Err(GraphError::UnknownTask {
                task: edge.from.clone(),
                side: "from",
            });
        }
        if !index.contains_key(&edge.to) {
            return Err(GraphError::UnknownTask {
                task: edge.to.clone(),
                side: "to",
            });
        }
    }

    let mut nodes = tasks;
    for node in &mut nodes {
        node.parents.clear();
    }
    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for edge in all_edges {
        let from = index[&edge.from];
        let to = index[&edge.to];
        if seen_edges.insert((from, to)) {
            children[from].push(to);
            nodes[to].parents.push(edge.from.clone());
        }
        if let Some(condition) = edge.condition {
            nodes[to].conditions.push(condition);
        }
    }

    let order = topological_order(&nodes, &children, &index)?;

    for node in &nodes {
        validate_node(node)?;
    }

    let mut slots: Vec<Option<TaskNode>> = nodes.into_iter().map(Some).collect();
    let nodes = order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect();

    Ok(CompiledGraph { nodes })
}

fn topological_order(
    nodes: &[TaskNode],
    children: &[Vec<usize>],
    index: &HashMap<String, usize>,
) -> Result<Vec<usize>, GraphError> {
    let mut in_degree: Vec<usize> = nodes.iter().map(|n| n.parents.len()).collect();
    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(nodes.len());

    while let Some(i) = queue.pop_front() {
        sorted.push(i);
        for &child in &children[i] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if sorted.len() == nodes.len() {
        return Ok(sorted);
    }

    // Every unvisited node still has a parent among the unvisited ones, so
    // walking parents from any of them must revisit a node.
    let remaining: HashSet<usize> = (0..nodes.len()).filter(|&i| in_degree[i] > 0).collect();
    let start = (0..nodes.len())
        .find(|i| remaining.contains(i))
        .unwrap_or_default();
    let mut path = vec![start];
    let mut position: HashMap<usize, usize> = HashMap::from([(start, 0)]);
    let mut current = start;
    loop {
        let parent = nodes[current]
            .parents
            .iter()
            .map(|p| index[p])
            .filter(|p| remaining.contains(p))
            .min()
            .unwrap_or(current);
        if let Some(&at) = position.get(&parent) {
            let mut cycle: Vec<String> = path[at..]
                .iter()
                .rev()
                .map(|&i| nodes[i].name.clone())
                .collect();
            cycle.push(cycle[0].clone());
            return Err(GraphError::CycleDetected { cycle });
        }
        position.insert(parent, path.len());
        path.push(parent);
        current = parent;
    }
}

fn validate_node(node: &TaskNode) -> Result<(), GraphError> {
    use super::condition::Condition;

    let invalid = |reason: String| GraphError::InvalidCondition {
        task: node.name.clone(),
        reason,
    };

    for condition in &node.conditions.conditions {
        if let Some(key) = condition.event_key() {
            if key.trim().is_empty() {
                return Err(invalid("event key must not be empty".to_string()));
            }
        }
        if let Condition::Expression(predicate) = condition {
            if !node.parents.iter().any(|p| *p == predicate.task) {
                return Err(invalid(format!(
                    "expression references '{}', which is not a parent",
                    predicate.task
                )));
            }
            predicate.validate().map_err(invalid)?;
        }
    }

    for group in &node.concurrency {
        group
            .validate()
            .map_err(|reason| GraphError::InvalidConcurrency {
                scope: node.name.clone(),
                reason,
            })?;
    }

    Ok(())
}
