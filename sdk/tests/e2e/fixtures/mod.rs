//! Test fixtures for E2E tests
//!
//! Reusable task and workflow definitions, and transport wrappers.

pub mod tasks;
pub mod transport;
pub mod workflows;

#[allow(unused_imports)]
pub use tasks::*;
#[allow(unused_imports)]
pub use workflows::*;
