//! Durable suspension E2E tests: sleeps, event waits and worker restarts.

use crate::fixtures::tasks::{ApprovalTask, ReminderTask};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::RunOptions;
use kestrel_sdk::testing::TEST_WORKER;
use kestrel_sdk::{RunStatus, Workflow};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

fn reminder(side_effects: Arc<AtomicU32>) -> Workflow {
    Workflow::builder("reminder")
        .task(ReminderTask { side_effects })
        .build()
        .unwrap()
}

/// The sleep is held by the scheduler; the body resumes past its checkpoint.
#[tokio::test]
async fn test_durable_sleep_resumes_from_checkpoint() {
    with_timeout(TEST_TIMEOUT, "test_durable_sleep_resumes_from_checkpoint", async {
        let side_effects = Arc::new(AtomicU32::new(0));
        let env = start_env(vec![reminder(side_effects.clone())]).await;

        let handle = env
            .client()
            .run_no_wait("reminder", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.settle().await;
        assert_eq!(side_effects.load(Ordering::SeqCst), 1);
        assert_eq!(handle.refresh().await.unwrap().status, RunStatus::Running);

        env.advance(Duration::from_secs(1800)).await;
        assert_eq!(handle.refresh().await.unwrap().status, RunStatus::Running);

        env.advance(Duration::from_secs(1800)).await;
        let output = handle.result().await.unwrap();
        assert_eq!(
            output.value("remind"),
            Some(&json!({"followed_up": true, "step": 1}))
        );
        assert_eq!(side_effects.load(Ordering::SeqCst), 1);
    })
    .await;
}

/// A suspended task survives a worker restart.
#[tokio::test]
async fn test_durable_sleep_survives_worker_restart() {
    with_timeout(TEST_TIMEOUT, "test_durable_sleep_survives_worker_restart", async {
        let side_effects = Arc::new(AtomicU32::new(0));
        let mut env = start_env(vec![reminder(side_effects.clone())]).await;

        let handle = env
            .client()
            .run_no_wait("reminder", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.settle().await;
        env.stop_worker().await;

        env.advance(Duration::from_secs(3600)).await;
        assert_eq!(handle.refresh().await.unwrap().status, RunStatus::Running);

        env.start_worker().await.unwrap();
        let output = handle.result().await.unwrap();
        assert_eq!(output.value("remind").unwrap()["followed_up"], json!(true));
        assert_eq!(side_effects.load(Ordering::SeqCst), 1);
    })
    .await;
}

/// An invocation lost with its worker connection is dispatched again.
#[tokio::test]
async fn test_in_flight_task_requeued_after_disconnect() {
    with_timeout(TEST_TIMEOUT, "test_in_flight_task_requeued_after_disconnect", async {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Arc::new(Notify::new());
        let workflow = {
            let calls = calls.clone();
            let started = started.clone();
            Workflow::builder("long-job")
                .task_fn("job", move |ctx, _input: Value| {
                    let calls = calls.clone();
                    let started = started.clone();
                    async move {
                        let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        if call == 1 {
                            started.notify_one();
                            std::future::pending::<()>().await;
                        }
                        Ok(json!({"call": call, "attempt": ctx.attempt()}))
                    }
                })
                .build()
                .unwrap()
        };
        let env = start_env(vec![workflow]).await;

        let handle = env
            .client()
            .run_no_wait("long-job", &json!({}), RunOptions::new())
            .await
            .unwrap();
        started.notified().await;

        assert_eq!(env.scheduler().disconnect_worker(TEST_WORKER), 1);

        let output = handle.result().await.unwrap();
        // Same attempt: a lost connection is not a task failure.
        assert_eq!(output.value("job"), Some(&json!({"call": 2, "attempt": 1})));
        assert!(env.worker().unwrap().is_running());
    })
    .await;
}

/// An event pushed while the task is suspended resumes it with the payload.
#[tokio::test]
async fn test_wait_for_event_resumes_with_payload() {
    with_timeout(TEST_TIMEOUT, "test_wait_for_event_resumes_with_payload", async {
        let workflow = Workflow::builder("expense").task(ApprovalTask).build().unwrap();
        let env = start_env(vec![workflow]).await;

        // Pushed before the suspension, so it does not count.
        env.client()
            .events()
            .push("approval", &json!({"by": "early"}))
            .await
            .unwrap();
        let handle = env
            .client()
            .run_no_wait("expense", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.settle().await;
        assert_eq!(handle.refresh().await.unwrap().status, RunStatus::Running);

        env.client()
            .events()
            .push("approval", &json!({"by": "grace"}))
            .await
            .unwrap();
        let output = handle.result().await.unwrap();
        assert_eq!(output.value("approval"), Some(&json!({"approved_by": "grace"})));
    })
    .await;
}

#[tokio::test]
async fn test_wait_for_event_times_out() {
    with_timeout(TEST_TIMEOUT, "test_wait_for_event_times_out", async {
        let workflow = Workflow::builder("expense").task(ApprovalTask).build().unwrap();
        let env = start_env(vec![workflow]).await;

        let handle = env
            .client()
            .run_no_wait("expense", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.advance(Duration::from_secs(600)).await;

        let output = handle.result().await.unwrap();
        assert_eq!(output.value("approval"), Some(&json!({"approved_by": null})));
    })
    .await;
}
