//! Workflow E2E tests: ordering, handles, options and typed tasks.

use crate::fixtures::tasks::{EchoTask, GreetTask, Greeted};
use crate::fixtures::workflows::pipeline;
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::RunOptions;
use kestrel_sdk::testing::TestEnvironment;
use kestrel_sdk::{NodeExt, ParentRule, RunStatus, TaskOutcome, Workflow};
use serde_json::{json, Value};

/// A -> B: both appear in the result, B after A, and B saw A's output.
#[tokio::test]
async fn test_dependent_tasks_complete_in_order() {
    with_timeout(TEST_TIMEOUT, "test_dependent_tasks_complete_in_order", async {
        let env = start_env(vec![pipeline()]).await;

        let output = env
            .client()
            .run("pipeline", &json!({}))
            .await
            .expect("Run failed");

        assert_eq!(output.tasks(), vec!["a", "b"]);
        assert_eq!(output.value("a"), Some(&json!({"from": "a"})));
        assert_eq!(
            output.value("b"),
            Some(&json!({"from": "b", "saw": {"from": "a"}}))
        );
        let a = output.get("a").unwrap();
        let b = output.get("b").unwrap();
        assert!(a.completed_at <= b.completed_at);

        env.shutdown().await;
    })
    .await;
}

/// `run_no_wait` resolves to the same outputs `run` would produce.
#[tokio::test]
async fn test_run_no_wait_matches_run() {
    with_timeout(TEST_TIMEOUT, "test_run_no_wait_matches_run", async {
        let env = start_env(vec![pipeline()]).await;
        let client = env.client();

        let direct = client.run("pipeline", &json!({})).await.unwrap();
        let handle = client
            .run_no_wait("pipeline", &json!({}), RunOptions::new())
            .await
            .unwrap();
        let deferred = handle.result().await.unwrap();

        assert_ne!(direct.run_id(), deferred.run_id());
        assert_eq!(direct.outcomes(), deferred.outcomes());
        assert_eq!(handle.status(), RunStatus::Succeeded);

        // A settled handle keeps returning the same result.
        let again = handle.result().await.unwrap();
        assert_eq!(again.outcomes(), deferred.outcomes());
    })
    .await;
}

#[tokio::test]
async fn test_run_options_metadata_and_idempotency() {
    with_timeout(TEST_TIMEOUT, "test_run_options_metadata_and_idempotency", async {
        let env = start_env(vec![pipeline()]).await;
        let options = RunOptions::new()
            .with_idempotency_key("order-42")
            .with_metadata("tenant", "acme");

        let first = env
            .client()
            .run_no_wait("pipeline", &json!({}), options.clone())
            .await
            .unwrap();
        let second = env
            .client()
            .run_no_wait("pipeline", &json!({}), options)
            .await
            .unwrap();
        assert_eq!(first.run_id(), second.run_id());

        let output = second.result().await.unwrap();
        assert_eq!(output.metadata().get("tenant").map(String::as_str), Some("acme"));
        assert_eq!(env.scheduler().runs_of("pipeline").len(), 1);
    })
    .await;
}

/// A handle rebuilt from a run id observes the same run.
#[tokio::test]
async fn test_run_handle_reattaches() {
    with_timeout(TEST_TIMEOUT, "test_run_handle_reattaches", async {
        let env = start_env(vec![pipeline()]).await;
        let original = env
            .client()
            .run_no_wait("pipeline", &json!({}), RunOptions::new())
            .await
            .unwrap();
        let expected = original.result().await.unwrap();

        let reattached = env.client().run_handle(original.run_id()).await.unwrap();
        assert_eq!(reattached.workflow(), "pipeline");
        assert_eq!(reattached.status(), RunStatus::Succeeded);
        assert_eq!(
            reattached.result().await.unwrap().outcomes(),
            expected.outcomes()
        );
    })
    .await;
}

/// Standalone typed and dynamic tasks run as single-node workflows.
#[tokio::test]
async fn test_registered_tasks_run_directly() {
    with_timeout(TEST_TIMEOUT, "test_registered_tasks_run_directly", async {
        // The worker announces the workflows known when it starts.
        let mut env = TestEnvironment::builder().without_worker().build().await.unwrap();
        env.client().register_task(GreetTask).await.unwrap();
        env.client().register_task(EchoTask).await.unwrap();
        env.start_worker().await.unwrap();

        let greeted = env
            .client()
            .run("greet", &json!({"name": "Ada"}))
            .await
            .unwrap();
        assert_eq!(
            greeted.output::<Greeted>("greet").unwrap(),
            Greeted {
                message: "Hello, Ada!".to_string()
            }
        );

        let echoed = env.client().run("echo", &json!({"k": [1, 2]})).await.unwrap();
        assert_eq!(echoed.value("echo"), Some(&json!({"k": [1, 2]})));
    })
    .await;
}

/// With `AnySucceeded`, a skipped parent does not skip the join.
#[tokio::test]
async fn test_any_succeeded_parent_rule() {
    with_timeout(TEST_TIMEOUT, "test_any_succeeded_parent_rule", async {
        let workflow = Workflow::builder("join")
            .task_fn("left", |_ctx, _input: Value| async move { Ok(json!("l")) })
            .task_fn_with(
                "right",
                |_ctx, _input: Value| async move { Ok(json!("r")) },
                |node| node.with_condition(kestrel_sdk::Condition::run_on_event("never")),
            )
            .task_fn_with(
                "join",
                |_ctx, _input: Value| async move { Ok(json!("joined")) },
                |node| {
                    node.depends_on_all(["left", "right"])
                        .with_parent_rule(ParentRule::AnySucceeded)
                },
            )
            .build()
            .unwrap();
        let env = start_env(vec![workflow]).await;

        let output = env.client().run("join", &json!({})).await.unwrap();
        assert!(output.is_skipped("right"));
        assert_eq!(output.value("join"), Some(&json!("joined")));
        assert!(matches!(
            output.get("left").map(|r| &r.outcome),
            Some(TaskOutcome::Succeeded { .. })
        ));
    })
    .await;
}

/// An `expression` condition reads a parent's output.
#[tokio::test]
async fn test_expression_condition_on_parent_output() {
    with_timeout(TEST_TIMEOUT, "test_expression_condition_on_parent_output", async {
        use kestrel_sdk::{Condition, Predicate};

        let workflow = Workflow::builder("review")
            .task_fn("score", |_ctx, input: Value| async move {
                Ok(json!({"score": input["score"].clone()}))
            })
            .task_fn_with(
                "escalate",
                |_ctx, _input: Value| async move { Ok(json!("escalated")) },
                |node| {
                    node.depends_on("score")
                        .with_condition(Condition::expression(Predicate::gt(
                            "score",
                            "/score",
                            json!(80),
                        )))
                },
            )
            .build()
            .unwrap();
        let env = start_env(vec![workflow]).await;

        let high = env.client().run("review", &json!({"score": 95})).await.unwrap();
        assert_eq!(high.value("escalate"), Some(&json!("escalated")));

        let low = env.client().run("review", &json!({"score": 10})).await.unwrap();
        assert!(low.is_skipped("escalate"));
    })
    .await;
}
