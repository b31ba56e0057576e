//! Concurrency E2E tests: lanes, rate limits and cancel strategies.

use crate::fixtures::tasks::Gate;
use crate::fixtures::workflows::{by_customer, gated_limited, limited};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::RunOptions;
use kestrel_sdk::error::KestrelError;
use kestrel_sdk::testing::CONCURRENCY_REASON;
use kestrel_sdk::{ConcurrencyGroup, KeyExpression, RunStatus};
use serde_json::json;
use std::time::Duration;

/// Submission `i` of one key lands in lane `i mod n`.
#[tokio::test]
async fn test_round_robin_lane_assignment() {
    with_timeout(TEST_TIMEOUT, "test_round_robin_lane_assignment", async {
        let env = start_env(vec![limited(
            "fan-out",
            ConcurrencyGroup::round_robin(by_customer(), 3),
        )])
        .await;

        let mut handles = Vec::new();
        for _ in 0..7 {
            handles.push(
                env.client()
                    .run_no_wait("fan-out", &json!({"customer": "c1"}), RunOptions::new())
                    .await
                    .unwrap(),
            );
        }
        // A different key counts its own submissions.
        let other = env
            .client()
            .run_no_wait("fan-out", &json!({"customer": "c2"}), RunOptions::new())
            .await
            .unwrap();

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(
                env.scheduler().lane_of(handle.run_id()),
                Some((i % 3) as u32),
                "submission {}",
                i
            );
        }
        assert_eq!(env.scheduler().lane_of(other.run_id()), Some(0));

        for handle in handles {
            assert!(handle.result().await.is_ok());
        }
    })
    .await;
}

/// A concurrent rate limit holds extra runs in `queued` until a slot frees.
#[tokio::test]
async fn test_rate_limit_queues_excess_runs() {
    with_timeout(TEST_TIMEOUT, "test_rate_limit_queues_excess_runs", async {
        let gate = Gate::default();
        let env = start_env(vec![gated_limited(
            "exclusive",
            gate.clone(),
            ConcurrencyGroup::rate_limit(KeyExpression::Static("global".to_string()), 1),
        )])
        .await;

        let first = env
            .client()
            .run_no_wait("exclusive", &json!({}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;
        let second = env
            .client()
            .run_no_wait("exclusive", &json!({}), RunOptions::new())
            .await
            .unwrap();
        assert_eq!(second.refresh().await.unwrap().status, RunStatus::Queued);

        gate.release.notify_one();
        first.result().await.unwrap();

        gate.started.notified().await;
        gate.release.notify_one();
        second.result().await.unwrap();
    })
    .await;
}

/// A windowed rate limit admits `max` runs per window.
#[tokio::test]
async fn test_windowed_rate_limit() {
    with_timeout(TEST_TIMEOUT, "test_windowed_rate_limit", async {
        let env = start_env(vec![limited(
            "metered",
            ConcurrencyGroup::rate_limit_per_window(by_customer(), 2, Duration::from_secs(60)),
        )])
        .await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            handles.push(
                env.client()
                    .run_no_wait("metered", &json!({"customer": "c1"}), RunOptions::new())
                    .await
                    .unwrap(),
            );
        }
        env.settle().await;

        let statuses: Vec<RunStatus> = {
            let mut statuses = Vec::new();
            for handle in &handles {
                statuses.push(handle.refresh().await.unwrap().status);
            }
            statuses
        };
        assert_eq!(
            statuses,
            vec![RunStatus::Succeeded, RunStatus::Succeeded, RunStatus::Queued]
        );

        env.advance(Duration::from_secs(60)).await;
        assert!(handles[2].result().await.is_ok());
    })
    .await;
}

/// `cancel-in-progress` cancels the oldest active run to admit a new one.
#[tokio::test]
async fn test_cancel_in_progress_evicts_oldest() {
    with_timeout(TEST_TIMEOUT, "test_cancel_in_progress_evicts_oldest", async {
        let gate = Gate::default();
        let env = start_env(vec![gated_limited(
            "deploy",
            gate.clone(),
            ConcurrencyGroup::cancel_in_progress(by_customer(), 1),
        )])
        .await;

        let old = env
            .client()
            .run_no_wait("deploy", &json!({"customer": "c1"}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;

        let new = env
            .client()
            .run_no_wait("deploy", &json!({"customer": "c1"}), RunOptions::new())
            .await
            .unwrap();

        match old.result().await {
            Err(KestrelError::Cancelled { reason, .. }) => assert_eq!(reason, CONCURRENCY_REASON),
            other => panic!("expected cancellation, got {:?}", other.map(|o| o.run_id())),
        }
        gate.started.notified().await;
        gate.release.notify_one();
        assert!(new.result().await.is_ok());
    })
    .await;
}

/// `cancel-newest` cancels the most recently admitted active run.
#[tokio::test]
async fn test_cancel_newest_evicts_latest_active_run() {
    with_timeout(TEST_TIMEOUT, "test_cancel_newest_evicts_latest_active_run", async {
        let gate = Gate::default();
        let env = start_env(vec![gated_limited(
            "sync",
            gate.clone(),
            ConcurrencyGroup::cancel_newest(by_customer(), 2),
        )])
        .await;
        let submit = || async {
            let handle = env
                .client()
                .run_no_wait("sync", &json!({"customer": "c1"}), RunOptions::new())
                .await
                .unwrap();
            gate.started.notified().await;
            handle
        };

        let oldest = submit().await;
        let newest = submit().await;
        let incoming = submit().await;

        match newest.result().await {
            Err(KestrelError::Cancelled { reason, .. }) => assert_eq!(reason, CONCURRENCY_REASON),
            other => panic!("expected cancellation, got {:?}", other.map(|o| o.run_id())),
        }
        gate.release.notify_one();
        gate.release.notify_one();
        assert!(oldest.result().await.is_ok());
        assert!(incoming.result().await.is_ok());
    })
    .await;
}
