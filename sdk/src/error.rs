//! Error types for the Kestrel SDK

pub use kestrel_core::{CoreError, GraphError};
use kestrel_core::SuspendRequest;
use uuid::Uuid;

/// Local validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// The workflow graph did not compile
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Run input does not match the workflow's declared input type
    #[error("Input for workflow '{workflow}' is invalid: {reason}")]
    Input { workflow: String, reason: String },

    /// Cron expression could not be parsed
    #[error("Invalid cron expression '{expression}': {reason}")]
    CronExpression { expression: String, reason: String },

    /// Schedule request is malformed
    #[error("Invalid schedule: {0}")]
    Schedule(String),

    /// Client configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The scheduler rejected the request as invalid
    #[error("Rejected by scheduler: {0}")]
    Rejected(String),
}

/// Main error type for the Kestrel SDK
#[derive(Debug, thiserror::Error)]
pub enum KestrelError {
    /// Bad graph, bad input, bad cron expression
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown workflow, run, schedule or cron
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The scheduler could not be reached. Never retried implicitly.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A task failed terminally
    #[error("Run {run_id} failed in task '{task}': {error}")]
    RunFailed {
        run_id: Uuid,
        task: String,
        error: String,
    },

    /// Cancellation was requested on the run's handle
    #[error("Run {run_id} cancelled: {reason}")]
    Cancelled { run_id: Uuid, reason: String },

    /// Returned by a task body to suspend durably. Propagate it with `?`.
    #[error("Task suspended at step {}", .0.step)]
    Suspended(SuspendRequest),

    /// Task observed its cancellation
    #[error("Task cancelled")]
    TaskCancelled,

    /// Task execution failed (retryable)
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Non-retryable error (permanent failure)
    #[error("Non-retryable error: {0}")]
    NonRetryable(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Client or worker was shut down
    #[error("Shut down")]
    Shutdown,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Kestrel SDK operations
pub type Result<T> = std::result::Result<T, KestrelError>;

impl KestrelError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<GraphError> for KestrelError {
    fn from(err: GraphError) -> Self {
        KestrelError::Validation(ValidationError::Graph(err))
    }
}

impl From<CoreError> for KestrelError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Grpc(status) => match status.code() {
                tonic::Code::NotFound => KestrelError::NotFound {
                    kind: "Resource",
                    id: status.message().to_string(),
                },
                tonic::Code::InvalidArgument | tonic::Code::FailedPrecondition => {
                    KestrelError::Validation(ValidationError::Rejected(
                        status.message().to_string(),
                    ))
                }
                _ => KestrelError::Transport(status.to_string()),
            },
            CoreError::Graph(e) => e.into(),
            CoreError::Serialization(e) => KestrelError::Serialization(e),
            CoreError::Io(e) => KestrelError::Io(e),
            CoreError::InvalidConfiguration(msg) => KestrelError::InvalidConfiguration(msg),
            CoreError::Timeout(msg) => KestrelError::Transport(format!("Timeout: {}", msg)),
            CoreError::Other(msg) => KestrelError::Other(msg),
        }
    }
}

impl From<tonic::transport::Error> for KestrelError {
    fn from(err: tonic::transport::Error) -> Self {
        KestrelError::Transport(err.to_string())
    }
}
