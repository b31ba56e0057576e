//! Test workflow definitions for E2E tests

#![allow(dead_code)]

use super::tasks::{Gate, GatedStreamingTask};
use kestrel_sdk::{ConcurrencyGroup, Condition, KeyExpression, NodeExt, Workflow};
use serde_json::{json, Value};
use std::time::Duration;

/// `a -> b`; each task records its parent's output.
pub fn pipeline() -> Workflow {
    Workflow::builder("pipeline")
        .task_fn("a", |_ctx, _input: Value| async move { Ok(json!({"from": "a"})) })
        .task_fn_with(
            "b",
            |ctx, _input: Value| async move {
                let parent = ctx.parent_output_value("a").cloned().unwrap_or(Value::Null);
                Ok(json!({"from": "b", "saw": parent}))
            },
            |node| node.depends_on("a"),
        )
        .build()
        .expect("pipeline compiles")
}

/// One task guarded by `conditions`, after an unconditional root.
pub fn guarded(name: &str, conditions: Vec<Condition>) -> Workflow {
    Workflow::builder(name)
        .task_fn("prepare", |_ctx, _input: Value| async move { Ok(json!("ready")) })
        .task_fn_with(
            "notify",
            |_ctx, _input: Value| async move { Ok(json!("notified")) },
            move |node| {
                conditions
                    .into_iter()
                    .fold(node.depends_on("prepare"), |node, c| node.with_condition(c))
            },
        )
        .build()
        .expect("guarded workflow compiles")
}

/// A single task gated by a workflow-level concurrency group.
pub fn limited(name: &str, group: ConcurrencyGroup) -> Workflow {
    Workflow::builder(name)
        .task_fn("work", |_ctx, input: Value| async move { Ok(input) })
        .concurrency(group)
        .build()
        .expect("limited workflow compiles")
}

/// A task that parks on `gate` until released.
pub fn gated(name: &str, gate: Gate) -> Workflow {
    Workflow::builder(name)
        .task(GatedStreamingTask { gate })
        .build()
        .expect("gated workflow compiles")
}

/// [`gated`] under a workflow-level concurrency group.
pub fn gated_limited(name: &str, gate: Gate, group: ConcurrencyGroup) -> Workflow {
    Workflow::builder(name)
        .task(GatedStreamingTask { gate })
        .concurrency(group)
        .build()
        .expect("gated workflow compiles")
}

/// Started by `order.created` events.
pub fn on_order_created() -> Workflow {
    Workflow::builder("fulfil")
        .task_fn("ship", |_ctx, input: Value| async move {
            Ok(json!({"shipped": input["order"].clone()}))
        })
        .on_event("order.created")
        .build()
        .expect("event workflow compiles")
}

/// Per-customer key expression used by the concurrency tests.
pub fn by_customer() -> KeyExpression {
    KeyExpression::InputField("/customer".to_string())
}

/// Timeout used by the wait-for-event tests.
pub const APPROVAL_TIMEOUT: Duration = Duration::from_secs(60);
