//! Condition E2E tests: run, skip and wait on events.

use crate::fixtures::workflows::{guarded, APPROVAL_TIMEOUT};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::RunOptions;
use kestrel_sdk::{Condition, RunStatus, TaskOutcome};
use serde_json::json;
use std::time::Duration;

/// An event pushed before submission still skips the guarded node.
#[tokio::test]
async fn test_skip_on_event_pushed_before_run() {
    with_timeout(TEST_TIMEOUT, "test_skip_on_event_pushed_before_run", async {
        let env = start_env(vec![guarded(
            "notify-unless-opted-out",
            vec![Condition::skip_on_event("user.opted_out")],
        )])
        .await;

        env.client()
            .events()
            .push("user.opted_out", &json!({"user": 7}))
            .await
            .unwrap();
        let output = env
            .client()
            .run("notify-unless-opted-out", &json!({}))
            .await
            .unwrap();

        assert_eq!(output.value("prepare"), Some(&json!("ready")));
        assert!(output.is_skipped("notify"));
        match &output.get("notify").unwrap().outcome {
            TaskOutcome::Skipped { reason } => assert!(reason.contains("user.opted_out")),
            other => panic!("expected skipped, got {:?}", other),
        }
    })
    .await;
}

/// Without a matching event, a timed wait ends in `skipped`, never `failed`.
#[tokio::test]
async fn test_wait_for_event_timeout_skips() {
    with_timeout(TEST_TIMEOUT, "test_wait_for_event_timeout_skips", async {
        let env = start_env(vec![guarded(
            "await-approval",
            vec![Condition::wait_for_event_with_timeout(
                "approved",
                APPROVAL_TIMEOUT,
            )],
        )])
        .await;
        let handle = env
            .client()
            .run_no_wait("await-approval", &json!({}), RunOptions::new())
            .await
            .unwrap();

        env.advance(APPROVAL_TIMEOUT - Duration::from_secs(1)).await;
        assert_eq!(handle.refresh().await.unwrap().status, RunStatus::Running);

        env.advance(Duration::from_secs(1)).await;
        let output = handle.result().await.unwrap();
        assert!(output.is_skipped("notify"));
    })
    .await;
}

/// The awaited event arriving inside the window runs the node.
#[tokio::test]
async fn test_wait_for_event_runs_when_event_arrives() {
    with_timeout(TEST_TIMEOUT, "test_wait_for_event_runs_when_event_arrives", async {
        let env = start_env(vec![guarded(
            "await-approval",
            vec![Condition::wait_for_event_with_timeout(
                "approved",
                APPROVAL_TIMEOUT,
            )],
        )])
        .await;
        let handle = env
            .client()
            .run_no_wait("await-approval", &json!({}), RunOptions::new())
            .await
            .unwrap();

        env.advance(Duration::from_secs(10)).await;
        env.client()
            .events()
            .push("approved", &json!({}))
            .await
            .unwrap();

        let output = handle.result().await.unwrap();
        assert_eq!(output.value("notify"), Some(&json!("notified")));
    })
    .await;
}

/// Skip wins over a pending wait when the skip event fires first.
#[tokio::test]
async fn test_skip_takes_precedence_over_wait() {
    with_timeout(TEST_TIMEOUT, "test_skip_takes_precedence_over_wait", async {
        let env = start_env(vec![guarded(
            "approve-or-abort",
            vec![
                Condition::wait_for_event("approved"),
                Condition::skip_on_event("aborted"),
            ],
        )])
        .await;
        let handle = env
            .client()
            .run_no_wait("approve-or-abort", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.settle().await;

        env.client()
            .events()
            .push("aborted", &json!({}))
            .await
            .unwrap();
        // Arrives after the node was already skipped.
        env.client()
            .events()
            .push("approved", &json!({}))
            .await
            .unwrap();

        let output = handle.result().await.unwrap();
        assert!(output.is_skipped("notify"));
    })
    .await;
}

/// `run-on-event` without its event skips; with it, runs.
#[tokio::test]
async fn test_run_on_event() {
    with_timeout(TEST_TIMEOUT, "test_run_on_event", async {
        let env = start_env(vec![guarded(
            "beta-only",
            vec![Condition::run_on_event("beta.enabled")],
        )])
        .await;

        let before = env.client().run("beta-only", &json!({})).await.unwrap();
        assert!(before.is_skipped("notify"));

        env.client()
            .events()
            .push("beta.enabled", &json!(true))
            .await
            .unwrap();
        let after = env.client().run("beta-only", &json!({})).await.unwrap();
        assert_eq!(after.value("notify"), Some(&json!("notified")));
    })
    .await;
}
