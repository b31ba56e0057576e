//! Client for triggering and observing workflow runs

pub mod builder;
pub mod grpc_transport;
pub mod kestrel_client;
pub mod run_handle;
pub mod run_output;
pub mod stream;
pub mod transport;
pub mod triggers;

pub use builder::KestrelClientBuilder;
pub use grpc_transport::GrpcTransport;
pub use kestrel_client::{KestrelClient, RunOptions};
pub use run_handle::{RunHandle, RunState, TIMEOUT_REASON};
pub use run_output::RunOutput;
pub use stream::RunStream;
pub use transport::{ChunkStream, CommandStream, SchedulerTransport};
pub use triggers::{parse_cron_expression, Crons, Events, Schedules};
