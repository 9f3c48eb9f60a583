//! HTTP client façade.
//!
//! Every request goes through the hook slot first: when a mock instance is
//! active it receives the request together with this client's real transport,
//! otherwise the request is sent for real.

use crate::error::MockError;
use crate::message::{Request, Response};
use crate::transport::{hook, HttpTransport, Transport};
use hyper::Method;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Client sending unintercepted requests over the network.
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub async fn send(&self, request: Request) -> Result<Response, MockError> {
        // Clone the hook out of the slot so no lock is held while awaiting
        match hook::current() {
            Some(interceptor) => interceptor.intercept(request, self.transport.as_ref()).await,
            None => Ok(self.transport.send(request).await?),
        }
    }

    /// Blocking variant for synchronous callers.
    ///
    /// Synthesized responses never suspend; pass-through still needs whatever
    /// runtime the real transport depends on.
    pub fn send_blocking(&self, request: Request) -> Result<Response, MockError> {
        futures::executor::block_on(self.send(request))
    }

    pub async fn request(&self, method: Method, url: &str) -> Result<Response, MockError> {
        let request = Request::new(method, url)?;
        self.send(request).await
    }

    pub async fn get(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::GET, url).await
    }

    pub async fn post(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::POST, url).await
    }

    pub async fn put(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::PUT, url).await
    }

    pub async fn patch(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::PATCH, url).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::DELETE, url).await
    }

    pub async fn head(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::HEAD, url).await
    }

    pub async fn options(&self, url: &str) -> Result<Response, MockError> {
        self.request(Method::OPTIONS, url).await
    }
}
