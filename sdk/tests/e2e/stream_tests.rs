//! Streaming E2E tests

use crate::fixtures::tasks::Gate;
use crate::fixtures::workflows::{gated, pipeline};
use crate::{start_env, with_timeout, TEST_TIMEOUT};
use kestrel_sdk::client::RunOptions;
use kestrel_sdk::{ChunkContent, ChunkKind};
use serde_json::json;

/// Subscribing mid-run yields only chunks emitted after the subscription,
/// and the stream ends with the run.
#[tokio::test]
async fn test_mid_run_subscription_sees_later_chunks_only() {
    with_timeout(TEST_TIMEOUT, "test_mid_run_subscription_sees_later_chunks_only", async {
        let gate = Gate::default();
        let env = start_env(vec![gated("chat", gate.clone())]).await;

        let handle = env
            .client()
            .run_no_wait("chat", &json!({}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;

        let stream = handle.stream().await.unwrap();
        gate.release.notify_one();

        let chunks = stream.collect_chunks().await.unwrap();
        let kinds: Vec<ChunkKind> = chunks.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![ChunkKind::Text, ChunkKind::Progress]);
        assert_eq!(chunks[0].content.as_text(), Some("after"));
        assert!(chunks[0].sequence < chunks[1].sequence);
        assert!(matches!(
            &chunks[1].content,
            ChunkContent::Progress { progress, .. } if *progress == 1.0
        ));

        assert!(handle.result().await.is_ok());
    })
    .await;
}

/// Subscribing to a finished run yields an already-closed stream.
#[tokio::test]
async fn test_subscription_after_completion_is_empty() {
    with_timeout(TEST_TIMEOUT, "test_subscription_after_completion_is_empty", async {
        let env = start_env(vec![pipeline()]).await;

        let output = env.client().run("pipeline", &json!({})).await.unwrap();
        let stream = env.client().subscribe(output.run_id()).await.unwrap();
        assert!(stream.collect_chunks().await.unwrap().is_empty());
    })
    .await;
}

/// Two subscribers each get the full live sequence.
#[tokio::test]
async fn test_concurrent_subscribers_receive_same_text() {
    with_timeout(TEST_TIMEOUT, "test_concurrent_subscribers_receive_same_text", async {
        let gate = Gate::default();
        let env = start_env(vec![gated("chat", gate.clone())]).await;

        let handle = env
            .client()
            .run_no_wait("chat", &json!({}), RunOptions::new())
            .await
            .unwrap();
        gate.started.notified().await;

        let first = handle.stream().await.unwrap();
        let second = env.client().subscribe(handle.run_id()).await.unwrap();
        gate.release.notify_one();

        let (a, b) = tokio::join!(first.collect_text(), second.collect_text());
        assert_eq!(a.unwrap(), "after");
        assert_eq!(b.unwrap(), "after");
    })
    .await;
}
