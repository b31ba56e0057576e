//! Testing utilities: an in-memory scheduler with controllable time, a
//! ready-made client/worker environment, and a mock task context.

pub(crate) mod limiter;
pub mod mock_task_context;
pub mod test_environment;
pub mod test_scheduler;
pub mod time_controller;

pub use mock_task_context::{MockTaskContext, MockTaskContextBuilder};
pub use test_environment::{TestEnvironment, TestEnvironmentBuilder, TEST_WORKER};
pub use test_scheduler::{TestScheduler, CONCURRENCY_REASON};
pub use time_controller::TimeController;
