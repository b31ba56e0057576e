//! Worker-facing protocol types and connection policy.

mod command;
mod reconnection;

pub use command::{TaskCompletion, TaskInvocation, WorkerCommand, WorkerRegistration};
pub use reconnection::{ReconnectionStrategy, Reconnector};
