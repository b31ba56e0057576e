//! RunStream - single-pass sequence of chunks for one run

use crate::client::transport::ChunkStream;
use crate::error::Result;
use futures::{Stream, StreamExt};
use kestrel_core::{ChunkContent, StreamChunk};
use std::pin::Pin;
use std::task::{Context, Poll};
use uuid::Uuid;

/// Chunks emitted by a run's tasks from the moment of subscription.
///
/// The stream is finite: it ends when the run reaches a terminal state. It does
/// not replay history; combine it with `RunHandle::result` for the full picture.
pub struct RunStream {
    run_id: Uuid,
    inner: ChunkStream,
}

impl RunStream {
    pub(crate) fn new(run_id: Uuid, inner: ChunkStream) -> Self {
        Self { run_id, inner }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Next chunk, or `None` once the stream has ended
    pub async fn next_chunk(&mut self) -> Result<Option<StreamChunk>> {
        self.inner.next().await.transpose()
    }

    /// Drain the stream, concatenating text chunks
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(chunk) = self.next_chunk().await? {
            if let ChunkContent::Text { text: part } = &chunk.content {
                text.push_str(part);
            }
        }
        Ok(text)
    }

    /// Drain the stream
    pub async fn collect_chunks(mut self) -> Result<Vec<StreamChunk>> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

impl Stream for RunStream {
    type Item = Result<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for RunStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStream")
            .field("run_id", &self.run_id)
            .finish()
    }
}
