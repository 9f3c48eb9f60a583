//! Snare intercepts outbound HTTP requests made through [`Client`] and answers
//! them from routes registered on a [`Mock`], without touching the network.
//!
//! ```no_run
//! # async fn demo() -> Result<(), snare::MockError> {
//! use snare::{Client, Mock, RouteOptions};
//!
//! let mock = Mock::new();
//! let route = mock.get("https://foo/bar/", RouteOptions::new().status(202))?;
//!
//! let guard = mock.activate()?;
//! let response = Client::new().get("https://foo/bar/").await?;
//! assert_eq!(response.status(), 202);
//! assert!(route.called());
//! guard.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `message`: normalized request/response types and recorded calls
//! - `pattern`: URL pattern matching
//! - `content`: response templates and content resolution
//! - `route`: registered routes and custom matchers
//! - `registry`: ordered route registry and first-match selection
//! - `ledger`: dispatch-ordered call recording
//! - `mock`: mock instances, lifecycle, scoped guards and the global instance
//! - `transport`: transport/interceptor traits, hook slot, reqwest transport
//! - `client`: the HTTP client façade that honours the hook slot
//! - `config`: instance configuration and declarative route files

pub mod client;
pub mod config;
pub mod content;
pub mod error;
pub mod message;
pub mod mock;
pub mod pattern;
pub mod route;
pub mod transport;

mod ledger;
mod registry;

pub use client::Client;
pub use config::{MockConfig, RouteFile, RouteSpec};
pub use content::{Content, ResponseTemplate};
pub use error::{AssertionError, MockError, TransportError, UsageError};
pub use message::{Call, Context, Request, Response};
pub use mock::{Mock, MockGuard, Stats};
pub use pattern::{UrlMatcher, UrlPattern};
pub use route::{Route, RouteOptions, Verdict};
pub use transport::{HttpTransport, Interceptor, Transport};

// Module-level convenience surface backed by the global instance
pub use mock::global::{
    aliases, any, calls, delete, get, global, head, matcher, mocked, mocked_async, options, patch,
    post, put, request, reset, route, start, stats, stop, stop_with, try_mocked, try_mocked_async,
    try_with_mock, try_with_mock_async, with_mock, with_mock_async,
};

// Re-export the HTTP vocabulary used throughout the API
pub use hyper::header::{HeaderMap, HeaderName, HeaderValue};
pub use hyper::{Method, StatusCode};
