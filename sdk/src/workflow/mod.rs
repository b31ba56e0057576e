//! Workflow graphs and their registry

pub mod definition;
pub mod registry;

pub use definition::{NodeExt, Workflow, WorkflowBuilder};
pub use registry::WorkflowRegistry;
