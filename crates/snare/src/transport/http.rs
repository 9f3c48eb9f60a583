//! reqwest-backed transport performing real network I/O.

use super::Transport;
use crate::error::TransportError;
use crate::message::{Request, Response};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Real HTTP transport used for pass-through and unintercepted requests.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport with an overall per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let url = reqwest::Url::parse(request.url())
            .map_err(|e| TransportError::Other(format!("invalid URL {}: {e}", request.url())))?;

        debug!("Sending {} {} over the network", request.method(), url);
        let response = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone())
            .body(request.body().clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Response::new(status, headers, body))
    }
}
