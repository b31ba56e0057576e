//! Test task definitions for E2E tests

#![allow(dead_code)]

use async_trait::async_trait;
use kestrel_sdk::error::{KestrelError, Result};
use kestrel_sdk::task::{DynamicTask, DynamicTaskInput, DynamicTaskOutput, TaskContext, TaskContextExt};
use kestrel_sdk::{Backoff, RetryPolicy, ResumeCause};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Task that echoes its input.
pub struct EchoTask;

#[async_trait]
impl DynamicTask for EchoTask {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(
        &self,
        input: DynamicTaskInput,
        _ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        Ok(input)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Greeting {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Greeted {
    pub message: String,
}

/// Typed task: `{name}` to `{message}`.
pub struct GreetTask;

#[async_trait]
impl kestrel_sdk::TaskDefinition for GreetTask {
    type Input = Greeting;
    type Output = Greeted;

    fn name(&self) -> &str {
        "greet"
    }

    async fn execute(&self, input: Greeting, _ctx: &dyn TaskContext) -> Result<Greeted> {
        Ok(Greeted {
            message: format!("Hello, {}!", input.name),
        })
    }
}

/// Task that fails until its `succeed_on` attempt.
pub struct FlakyTask {
    pub calls: Arc<AtomicU32>,
    pub succeed_on: u32,
    pub max_attempts: u32,
}

impl FlakyTask {
    pub fn new(succeed_on: u32, max_attempts: u32) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            succeed_on,
            max_attempts,
        }
    }
}

#[async_trait]
impl DynamicTask for FlakyTask {
    fn name(&self) -> &str {
        "flaky"
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Backoff::fixed(Duration::from_secs(5)))
    }

    async fn execute(
        &self,
        _input: DynamicTaskInput,
        ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.attempt() < self.succeed_on {
            return Err(KestrelError::TaskFailed(format!(
                "attempt {} failed",
                ctx.attempt()
            )));
        }
        let mut output = DynamicTaskOutput::new();
        output.insert("attempt".to_string(), json!(ctx.attempt()));
        Ok(output)
    }
}

/// Task that fails permanently on its first attempt.
pub struct RejectingTask;

#[async_trait]
impl DynamicTask for RejectingTask {
    fn name(&self) -> &str {
        "reject"
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(5, Backoff::None)
    }

    async fn execute(
        &self,
        _input: DynamicTaskInput,
        _ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        Err(KestrelError::NonRetryable("card declined".to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReminderCheckpoint {
    pub reminded: bool,
}

/// Sends a reminder, sleeps an hour durably, then follows up.
///
/// `side_effects` counts reminder sends so tests can check the first half
/// never runs twice.
pub struct ReminderTask {
    pub side_effects: Arc<AtomicU32>,
}

#[async_trait]
impl DynamicTask for ReminderTask {
    fn name(&self) -> &str {
        "remind"
    }

    async fn execute(
        &self,
        _input: DynamicTaskInput,
        ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        let checkpoint: ReminderCheckpoint = ctx.checkpoint()?.unwrap_or_default();
        if !checkpoint.reminded {
            self.side_effects.fetch_add(1, Ordering::SeqCst);
            ctx.sleep_for(Duration::from_secs(3600), &ReminderCheckpoint { reminded: true })?;
        }

        let mut output = DynamicTaskOutput::new();
        output.insert("followed_up".to_string(), json!(true));
        output.insert("step".to_string(), json!(ctx.step()));
        Ok(output)
    }
}

/// Waits for `approval` with a ten minute timeout.
pub struct ApprovalTask;

#[async_trait]
impl DynamicTask for ApprovalTask {
    fn name(&self) -> &str {
        "approval"
    }

    async fn execute(
        &self,
        _input: DynamicTaskInput,
        ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        let mut output = DynamicTaskOutput::new();
        match ctx.resumption().map(|r| &r.cause) {
            None => {
                ctx.wait_for_event("approval", Some(Duration::from_secs(600)), &json!({}))?;
            }
            Some(ResumeCause::EventReceived { payload }) => {
                output.insert("approved_by".to_string(), payload["by"].clone());
            }
            Some(_) => {
                output.insert("approved_by".to_string(), Value::Null);
            }
        }
        Ok(output)
    }
}

/// Streams `before`, parks until released, then streams `after`.
#[derive(Clone, Default)]
pub struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct GatedStreamingTask {
    pub gate: Gate,
}

#[async_trait]
impl DynamicTask for GatedStreamingTask {
    fn name(&self) -> &str {
        "gated"
    }

    async fn execute(
        &self,
        _input: DynamicTaskInput,
        ctx: &dyn TaskContext,
    ) -> Result<DynamicTaskOutput> {
        ctx.stream_text("before").await?;
        self.gate.started.notify_one();
        self.gate.release.notified().await;
        ctx.stream_text("after").await?;
        ctx.stream_progress(1.0, Some("done")).await?;
        Ok(DynamicTaskOutput::new())
    }
}
