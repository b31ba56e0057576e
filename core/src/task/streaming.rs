//! Stream chunk types for partial results published while a task runs.
//!
//! Chunks are ephemeral: the scheduler fans them out to the subscribers
//! connected at the time they are published and does not replay them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of a stream chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// Text fragment, e.g. an LLM token
    Text,
    /// Progress update (0.0-1.0)
    Progress,
    /// Arbitrary structured partial result
    Data,
    /// Recoverable error notification
    Error,
}

/// Payload of a stream chunk.
///
/// # Example
///
/// ```rust
/// use kestrel_core::task::ChunkContent;
/// use serde_json::json;
///
/// let chunk = ChunkContent::text("Hello");
/// let chunk = ChunkContent::progress(0.5, Some("Halfway"));
/// let chunk = ChunkContent::data(json!({"rows": 10}));
/// let chunk = ChunkContent::error("Rate limited", Some("RATE_LIMIT"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChunkContent {
    Text {
        text: String,
    },
    Progress {
        /// Clamped to 0.0-1.0 during serialization
        #[serde(serialize_with = "serialize_progress")]
        progress: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Data {
        data: Value,
    },
    /// For fatal errors, let the task fail instead.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl ChunkContent {
    pub fn kind(&self) -> ChunkKind {
        match self {
            ChunkContent::Text { .. } => ChunkKind::Text,
            ChunkContent::Progress { .. } => ChunkKind::Progress,
            ChunkContent::Data { .. } => ChunkKind::Data,
            ChunkContent::Error { .. } => ChunkKind::Error,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ChunkContent::Text { text: text.into() }
    }

    pub fn progress(progress: f64, details: Option<impl Into<String>>) -> Self {
        ChunkContent::Progress {
            progress,
            details: details.map(Into::into),
        }
    }

    pub fn data(data: Value) -> Self {
        ChunkContent::Data { data }
    }

    pub fn error(message: impl Into<String>, code: Option<impl Into<String>>) -> Self {
        ChunkContent::Error {
            message: message.into(),
            code: code.map(Into::into),
        }
    }

    /// Text payload, if this is a text chunk.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChunkContent::Text { text } => Some(text),
            _ => None,
        }
    }
}

fn serialize_progress<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(value.clamp(0.0, 1.0))
}

/// A chunk published by one task invocation of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub run_id: Uuid,
    /// Task that emitted the chunk
    pub task: String,
    /// Monotonically increasing per invocation
    pub sequence: u64,
    pub content: ChunkContent,
    pub emitted_at: DateTime<Utc>,
}

impl StreamChunk {
    pub fn new(run_id: Uuid, task: impl Into<String>, sequence: u64, content: ChunkContent) -> Self {
        Self {
            run_id,
            task: task.into(),
            sequence,
            content,
            emitted_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> ChunkKind {
        self.content.kind()
    }
}
