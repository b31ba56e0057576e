//! Task definitions and execution

pub mod context;
pub mod context_impl;
pub mod definition;
pub mod executor;
pub mod registry;

pub use context::{TaskContext, TaskContextExt};
pub use context_impl::TaskContextImpl;
pub use definition::{DynamicTask, DynamicTaskInput, DynamicTaskOutput, TaskDefinition};
pub use executor::TaskExecutor;
pub use registry::{RegisteredTask, TaskMetadata, TaskRegistry};
