//! Trigger E2E tests: event bindings, schedules and crons.

use crate::fixtures::workflows::{on_order_created, pipeline};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use chrono::Duration as ChronoDuration;
use kestrel_sdk::error::{KestrelError, ValidationError};
use kestrel_sdk::RunStatus;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Pushing a bound event starts a run with the payload as input.
#[tokio::test]
async fn test_event_starts_bound_workflow() {
    with_timeout(TEST_TIMEOUT, "test_event_starts_bound_workflow", async {
        let env = start_env(vec![on_order_created(), pipeline()]).await;

        env.client()
            .events()
            .push("order.created", &json!({"order": "o-1"}))
            .await
            .unwrap();
        env.client()
            .events()
            .push("order.cancelled", &json!({"order": "o-2"}))
            .await
            .unwrap();

        let runs = env.scheduler().runs_of("fulfil");
        assert_eq!(runs.len(), 1);
        assert!(env.scheduler().runs_of("pipeline").is_empty());

        let handle = env.client().run_handle(runs[0]).await.unwrap();
        let output = handle.result().await.unwrap();
        assert_eq!(output.value("ship"), Some(&json!({"shipped": "o-1"})));
        assert_eq!(env.scheduler().event_log().len(), 2);
    })
    .await;
}

/// A schedule creates no run until it fires, then exactly one.
#[tokio::test]
async fn test_schedule_fires_once() {
    with_timeout(TEST_TIMEOUT, "test_schedule_fires_once", async {
        let env = start_env(vec![pipeline()]).await;
        let trigger_at = env.now() + ChronoDuration::hours(2);

        let id = env
            .client()
            .schedules()
            .create("pipeline", trigger_at, &json!({}))
            .await
            .unwrap();
        let listed = env.client().schedules().list(Some("pipeline")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].trigger_at, trigger_at);

        env.advance(Duration::from_secs(3600)).await;
        assert!(env.scheduler().runs_of("pipeline").is_empty());

        env.advance(Duration::from_secs(3600 * 5)).await;
        let runs = env.scheduler().runs_of("pipeline");
        assert_eq!(runs.len(), 1);
        assert_eq!(
            env.scheduler().snapshot(runs[0]).unwrap().status,
            RunStatus::Succeeded
        );
        assert!(env.client().schedules().list(None).await.unwrap().is_empty());
    })
    .await;
}

#[tokio::test]
async fn test_deleted_schedule_never_fires() {
    with_timeout(TEST_TIMEOUT, "test_deleted_schedule_never_fires", async {
        let env = start_env(vec![pipeline()]).await;
        let id = env
            .client()
            .schedules()
            .create("pipeline", env.now() + ChronoDuration::minutes(5), &json!({}))
            .await
            .unwrap();

        env.client().schedules().delete(id).await.unwrap();
        env.advance(Duration::from_secs(600)).await;
        assert!(env.scheduler().runs_of("pipeline").is_empty());

        let err = env.client().schedules().delete(id).await.unwrap_err();
        assert!(matches!(err, KestrelError::NotFound { kind: "Schedule", .. }));
    })
    .await;
}

#[tokio::test]
async fn test_schedule_in_the_past_is_rejected_locally() {
    with_timeout(TEST_TIMEOUT, "test_schedule_in_the_past_is_rejected_locally", async {
        let env = start_env(vec![pipeline()]).await;
        let err = env
            .client()
            .schedules()
            .create("pipeline", chrono::Utc::now() - ChronoDuration::seconds(1), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KestrelError::Validation(ValidationError::Schedule(_))
        ));
    })
    .await;
}

/// A five-field cron fires on each occurrence until deleted.
#[tokio::test]
async fn test_cron_fires_each_occurrence() {
    with_timeout(TEST_TIMEOUT, "test_cron_fires_each_occurrence", async {
        let env = start_env(vec![pipeline()]).await;

        let id = env
            .client()
            .crons()
            .create("pipeline", "*/10 * * * *", &json!({}))
            .await
            .unwrap();
        let crons = env.client().crons().list(None).await.unwrap();
        assert_eq!(crons.len(), 1);
        assert_eq!(crons[0].expression, "0 */10 * * * *");

        env.advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(env.scheduler().runs_of("pipeline").len(), 3);

        env.client().crons().delete(id).await.unwrap();
        env.advance(Duration::from_secs(30 * 60)).await;
        assert_eq!(env.scheduler().runs_of("pipeline").len(), 3);
    })
    .await;
}

#[tokio::test]
async fn test_invalid_cron_and_unknown_ids() {
    with_timeout(TEST_TIMEOUT, "test_invalid_cron_and_unknown_ids", async {
        let env = start_env(vec![pipeline()]).await;

        let err = env
            .client()
            .crons()
            .create("pipeline", "every other tuesday", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KestrelError::Validation(ValidationError::CronExpression { .. })
        ));

        let err = env.client().crons().delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, KestrelError::NotFound { kind: "Cron", .. }));

        let err = env
            .client()
            .crons()
            .create("missing", "0 * * * *", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, KestrelError::NotFound { kind: "Workflow", .. }));
    })
    .await;
}
