//! Task retry policy, execution results and streaming types.

mod execution;
mod retry;
mod streaming;

pub use execution::TaskExecutionResult;
pub use retry::{calculate_backoff, should_retry, Backoff, RetryPolicy};
pub use streaming::{ChunkContent, ChunkKind, StreamChunk};
