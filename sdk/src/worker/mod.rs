//! Worker serving dispatched task invocations

pub mod task_worker;

pub use task_worker::{TaskWorker, WorkerHandle};
