//! Boundary with the HTTP client.
//!
//! - `Transport`: performs real requests (used for pass-through)
//! - `Interceptor`: the hook contract a mock instance fulfils
//! - `hook`: the process-wide slot the client consults before sending
//! - `http`: reqwest-backed real transport

pub mod hook;
mod http;

pub use http::HttpTransport;

use crate::error::{MockError, TransportError};
use crate::message::{Request, Response};
use async_trait::async_trait;

/// Real transport the client sends through when nothing intercepts.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// Receives every request while installed in the hook slot.
///
/// Implementations either answer directly, fail the call, or forward to
/// `transport` (pass-through) and post-process the real result.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> Result<Response, MockError>;
}
