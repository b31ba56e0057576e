//! gRPC client wrapper for the Kestrel scheduler.
//!
//! All calls carry the namespace and, when configured, a bearer token.

mod auth;
pub mod convert;
mod scheduler;

pub use auth::AuthInterceptor;
pub use scheduler::{ChunkStream, CommandStream, Scheduler};
