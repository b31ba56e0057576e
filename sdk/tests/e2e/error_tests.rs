//! Error E2E tests: retries, failures, cancellation and validation.

use crate::fixtures::tasks::{FlakyTask, Gate, Greeting, RejectingTask};
use crate::fixtures::transport::UnreachableSubmit;
use crate::fixtures::workflows::{gated, pipeline};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::{KestrelClient, RunOptions, TIMEOUT_REASON};
use kestrel_sdk::testing::TestScheduler;
use kestrel_sdk::error::{KestrelError, ValidationError};
use kestrel_sdk::{NodeExt, RunStatus, Workflow};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Retryable failures are retried after the declared backoff.
#[tokio::test]
async fn test_retry_until_success() {
    with_timeout(TEST_TIMEOUT, "test_retry_until_success", async {
        let flaky = FlakyTask::new(3, 3);
        let calls = flaky.calls.clone();
        let env = start_env(vec![Workflow::builder("flaky").task(flaky).build().unwrap()]).await;

        let handle = env
            .client()
            .run_no_wait("flaky", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        env.advance(Duration::from_secs(5)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        env.advance(Duration::from_secs(5)).await;
        let output = handle.result().await.unwrap();
        assert_eq!(output.value("flaky"), Some(&json!({"attempt": 3})));
    })
    .await;
}

/// Exhausted retries fail the run and leave downstream tasks unrecorded.
#[tokio::test]
async fn test_exhausted_retries_fail_run() {
    with_timeout(TEST_TIMEOUT, "test_exhausted_retries_fail_run", async {
        let workflow = Workflow::builder("doomed")
            .task(FlakyTask::new(10, 2))
            .task_fn_with(
                "after",
                |_ctx, _input: Value| async move { Ok(json!("unreachable")) },
                |node| node.depends_on("flaky"),
            )
            .build()
            .unwrap();
        let env = start_env(vec![workflow]).await;

        let handle = env
            .client()
            .run_no_wait("doomed", &json!({}), RunOptions::new())
            .await
            .unwrap();
        env.advance(Duration::from_secs(5)).await;

        match handle.result().await {
            Err(KestrelError::RunFailed { task, error, .. }) => {
                assert_eq!(task, "flaky");
                assert!(error.contains("attempt 2 failed"), "{}", error);
            }
            other => panic!("expected RunFailed, got {:?}", other.map(|o| o.run_id())),
        }
        let snapshot = handle.refresh().await.unwrap();
        assert_eq!(snapshot.status, RunStatus::Failed);
        assert!(snapshot.record("after").is_none());
    })
    .await;
}

/// Non-retryable errors are never retried.
#[tokio::test]
async fn test_non_retryable_error_fails_first_attempt() {
    with_timeout(TEST_TIMEOUT, "test_non_retryable_error_fails_first_attempt", async {
        let env = start_env(vec![Workflow::builder("charge")
            .task(RejectingTask)
            .build()
            .unwrap()])
        .await;

        let err = env.client().run("charge", &json!({})).await.unwrap_err();
        assert!(matches!(err, KestrelError::RunFailed { ref task, .. } if task == "reject"));
    })
    .await;
}

/// Cancel settles the handle at once and is a no-op the second time.
#[tokio::test]
async fn test_cancel_is_idempotent() {
    with_timeout(TEST_TIMEOUT, "test_cancel_is_idempotent", async {
        let gate = Gate::default();
        let env = start_env(vec![gated("chat", gate.clone())]).await;
        let handle = env
            .client()
            .run_no_wait("chat", &json!({}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;

        handle.cancel("user aborted").await.unwrap();
        handle.cancel("again").await.unwrap();

        match handle.result().await {
            Err(KestrelError::Cancelled { reason, .. }) => assert_eq!(reason, "user aborted"),
            other => panic!("expected Cancelled, got {:?}", other.map(|o| o.run_id())),
        }
        env.settle().await;
        let snapshot = handle.refresh().await.unwrap();
        assert_eq!(snapshot.status, RunStatus::Cancelled);
        assert_eq!(snapshot.cancel_reason.as_deref(), Some("user aborted"));
    })
    .await;
}

/// A waiter already blocked in `result()` fails as soon as cancel is requested.
#[tokio::test]
async fn test_cancel_unblocks_concurrent_waiter() {
    with_timeout(TEST_TIMEOUT, "test_cancel_unblocks_concurrent_waiter", async {
        let gate = Gate::default();
        let env = start_env(vec![gated("chat", gate.clone())]).await;
        let handle = env
            .client()
            .run_no_wait("chat", &json!({}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;

        let waiter = tokio::spawn({
            let handle = handle.clone();
            async move { handle.result().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel("superseded").await.unwrap();

        match waiter.await.unwrap() {
            Err(KestrelError::Cancelled { reason, .. }) => assert_eq!(reason, "superseded"),
            other => panic!("expected Cancelled, got {:?}", other.map(|o| o.run_id())),
        }
    })
    .await;
}

/// A transport failure on submission reaches the caller and is not retried.
#[tokio::test]
async fn test_submit_transport_error_is_not_retried() {
    with_timeout(TEST_TIMEOUT, "test_submit_transport_error_is_not_retried", async {
        let transport = UnreachableSubmit::new(TestScheduler::new());
        let client = KestrelClient::builder()
            .transport(Arc::new(transport.clone()))
            .register_workflow(pipeline())
            .build()
            .await
            .unwrap();

        let err = client
            .run_no_wait("pipeline", &json!({}), RunOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KestrelError::Transport(_)), "{:?}", err);
        assert_eq!(transport.submissions.load(Ordering::SeqCst), 1);

        let err = client.run("pipeline", &json!({})).await.unwrap_err();
        assert!(matches!(err, KestrelError::Transport(_)), "{:?}", err);
        assert_eq!(transport.submissions.load(Ordering::SeqCst), 2);
        assert!(transport.scheduler.runs_of("pipeline").is_empty());
    })
    .await;
}

/// Cancelling a finished run changes nothing.
#[tokio::test]
async fn test_cancel_after_completion_is_noop() {
    with_timeout(TEST_TIMEOUT, "test_cancel_after_completion_is_noop", async {
        let env = start_env(vec![pipeline()]).await;
        let handle = env
            .client()
            .run_no_wait("pipeline", &json!({}), RunOptions::new())
            .await
            .unwrap();
        let output = handle.result().await.unwrap();

        handle.cancel("late").await.unwrap();
        assert_eq!(handle.status(), RunStatus::Succeeded);
        assert_eq!(handle.result().await.unwrap().outcomes(), output.outcomes());
    })
    .await;
}

/// A handle timeout cancels the run.
#[tokio::test]
async fn test_handle_timeout_cancels_run() {
    with_timeout(TEST_TIMEOUT, "test_handle_timeout_cancels_run", async {
        let gate = Gate::default();
        let env = start_env(vec![gated("chat", gate.clone())]).await;
        let handle = env
            .client()
            .run_no_wait(
                "chat",
                &json!({}),
                RunOptions::new().with_timeout(Duration::from_millis(50)),
            )
            .await
            .unwrap();

        match handle.result().await {
            Err(KestrelError::Cancelled { reason, .. }) => assert_eq!(reason, TIMEOUT_REASON),
            other => panic!("expected Cancelled, got {:?}", other.map(|o| o.run_id())),
        }
        // The remote cancel is sent in the background.
        env.settle().await;
        let snapshot = handle.refresh().await.unwrap();
        assert_eq!(snapshot.status, RunStatus::Cancelled);
    })
    .await;
}

#[tokio::test]
async fn test_unknown_workflow_and_run() {
    with_timeout(TEST_TIMEOUT, "test_unknown_workflow_and_run", async {
        let env = start_env(vec![pipeline()]).await;

        let err = env.client().run("nope", &json!({})).await.unwrap_err();
        assert!(matches!(err, KestrelError::NotFound { kind: "Workflow", .. }));

        let err = env.client().run_handle(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, KestrelError::NotFound { kind: "Run", .. }));
    })
    .await;
}

/// Typed input is checked before anything is sent.
#[tokio::test]
async fn test_invalid_input_rejected_locally() {
    with_timeout(TEST_TIMEOUT, "test_invalid_input_rejected_locally", async {
        let workflow = Workflow::builder("greeter")
            .input_type::<Greeting>()
            .task_fn("noop", |_ctx, input: Value| async move { Ok(input) })
            .build()
            .unwrap();
        let env = start_env(vec![workflow]).await;

        let err = env
            .client()
            .run("greeter", &json!({"nom": "Ada"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KestrelError::Validation(ValidationError::Input { .. })
        ));
        assert!(env.scheduler().runs_of("greeter").is_empty());
    })
    .await;
}

/// Cyclic graphs fail to build and name a node on the cycle.
#[tokio::test]
async fn test_cyclic_workflow_rejected() {
    let err = Workflow::builder("loop")
        .task_fn_with(
            "a",
            |_ctx, input: Value| async move { Ok(input) },
            |node| node.depends_on("b"),
        )
        .task_fn_with(
            "b",
            |_ctx, input: Value| async move { Ok(input) },
            |node| node.depends_on("a"),
        )
        .build()
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains('a') || message.contains('b'), "{}", message);
    assert!(matches!(err, KestrelError::Validation(ValidationError::Graph(_))));
}
