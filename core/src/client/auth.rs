//! Authentication interceptor for gRPC requests
//!
//! Adds the namespace token to every call made to the Kestrel scheduler.

use crate::error::{CoreError, CoreResult};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Status};
use tracing::trace;

/// Interceptor that adds an `Authorization: Bearer <token>` header to all
/// outgoing gRPC requests. Without a token requests pass through untouched.
///
/// # Example
///
/// ```ignore
/// let interceptor = AuthInterceptor::new(Some("kst_abc123"))?;
/// let client = SchedulerClient::with_interceptor(channel, interceptor);
/// ```
#[derive(Clone, Default)]
pub struct AuthInterceptor {
    header: Option<MetadataValue<Ascii>>,
}

impl AuthInterceptor {
    /// Build an interceptor. Fails if the token is not a valid header value.
    pub fn new(token: Option<&str>) -> CoreResult<Self> {
        let header = token
            .map(|t| {
                format!("Bearer {}", t).parse().map_err(|_| {
                    CoreError::InvalidConfiguration(
                        "token contains characters not allowed in a header".to_string(),
                    )
                })
            })
            .transpose()?;
        Ok(Self { header })
    }

    pub fn has_token(&self) -> bool {
        self.header.is_some()
    }
}

impl Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(header) = &self.header {
            request
                .metadata_mut()
                .insert("authorization", header.clone());
            trace!("Attached bearer token to gRPC request");
        }
        Ok(request)
    }
}
