//! Error types for route registration, dispatch and teardown.

use thiserror::Error;

/// Umbrella error returned by dispatch and by the [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl MockError {
    pub fn is_usage(&self) -> bool {
        matches!(self, MockError::Usage(_))
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, MockError::Assertion(_))
    }

    /// The transport error, simulated or real, that aborted the call.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            MockError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// A caller configuration mistake, detected at registration or dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("invalid URL pattern {0}: expected a string, a regex or a URL matcher")]
    InvalidUrlPattern(String),
    #[error("invalid regex pattern {pattern:?}: {reason}")]
    InvalidRegex { pattern: String, reason: String },
    #[error("invalid request URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),
    #[error("invalid header {name:?}")]
    InvalidHeader { name: String },
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    #[error("alias {0:?} is already registered")]
    DuplicateAlias(String),
    #[error("custom matcher returned {0}, expected a response template, a pass-through or no match")]
    InvalidMatcherResult(String),
    #[error("content callback expects {missing:?} but the route captured {captured:?}")]
    ParameterMismatch {
        missing: Vec<String>,
        captured: Vec<String>,
    },
    #[error("invalid content: {0}")]
    InvalidContent(String),
    #[error("mock is already started")]
    AlreadyActive,
}

/// A coverage-policy violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssertionError {
    #[error("request not mocked: {method} {url}")]
    NotMocked { method: String, url: String },
    #[error("routes never called: {}", .0.join(", "))]
    NotCalled(Vec<String>),
}

/// A transport failure, either configured as route content or raised by the
/// real transport during pass-through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connect timed out")]
    ConnectTimeout,
    #[error("read timed out")]
    ReadTimeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            if e.is_connect() {
                TransportError::ConnectTimeout
            } else {
                TransportError::ReadTimeout
            }
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}
