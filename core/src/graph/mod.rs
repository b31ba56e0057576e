//! Workflow graph model, compiler, condition vocabulary and concurrency declarations.

mod compile;
mod concurrency;
mod condition;
mod evaluator;
mod model;

pub use compile::{compile, GraphError};
pub use concurrency::{lane_for, ConcurrencyGroup, ConcurrencyStrategy, KeyExpression};
pub use condition::{CompareOp, Condition, ConditionSet, MatchMode, Predicate};
pub use evaluator::{ConditionEvaluator, Decision, EventView};
pub use model::{CompiledGraph, Edge, ParentRule, TaskNode, WorkflowManifest};
