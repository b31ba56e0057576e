//! End-to-end tests for kestrel-sdk
//!
//! Each test wires a real client and worker to the in-memory scheduler from
//! the `testing` feature. Task bodies run on tokio; scheduler timers run on
//! virtual time and only move when a test advances them.
//!
//! # Running
//!
//! ```bash
//! RUST_LOG=kestrel_sdk=debug cargo test --test e2e -p kestrel-sdk
//! ```

mod concurrency_tests;
mod condition_tests;
mod durable_tests;
mod error_tests;
mod fixtures;
mod stream_tests;
mod trigger_tests;
mod workflow_tests;

use kestrel_sdk::testing::TestEnvironment;
use kestrel_sdk::Workflow;
use std::time::Duration;

/// Default timeout for E2E tests
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize tracing once for all tests
static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .init();
    });
}

/// Environment with `workflows` registered and the test worker running.
pub async fn start_env(workflows: Vec<Workflow>) -> TestEnvironment {
    init_tracing();
    TestEnvironment::new(workflows)
        .await
        .expect("Failed to build test environment")
}

/// Run a test with a timeout. Panics if the test takes longer than the specified duration.
pub async fn with_timeout<F, T>(timeout: Duration, test_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(result) => result,
        Err(_) => panic!("Test '{}' timed out after {:?}", test_name, timeout),
    }
}
