//! Response templates and content resolution.
//!
//! Content is resolved lazily for every matched call, so a callback can vary
//! its answer per request. Resolution is synchronous; only pass-through
//! dispatch ever awaits.

use crate::error::{MockError, TransportError, UsageError};
use crate::message::{Context, Request, Response};
use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

const TEXT_PLAIN: &str = "text/plain";
const APPLICATION_JSON: &str = "application/json";

pub type ContentCallback = dyn Fn(&Request, &Context) -> Content + Send + Sync;

/// What a matched route answers with.
#[derive(Clone, Default)]
pub enum Content {
    /// Empty body.
    #[default]
    Empty,
    Text(String),
    Bytes(Bytes),
    /// Serialized as JSON, `application/json` by default.
    Json(Value),
    /// Fail the call with this error instead of responding.
    Raise(TransportError),
    /// Computed per call from the request and the captured context. `params`
    /// are the context keys the callback relies on.
    Callback {
        params: Vec<String>,
        callback: Arc<ContentCallback>,
    },
}

impl Content {
    /// JSON content from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, UsageError> {
        serde_json::to_value(value)
            .map(Content::Json)
            .map_err(|e| UsageError::InvalidContent(e.to_string()))
    }

    /// Callback content that doesn't rely on captured values.
    pub fn callback<F, C>(callback: F) -> Self
    where
        F: Fn(&Request, &Context) -> C + Send + Sync + 'static,
        C: Into<Content>,
    {
        Self::callback_with(std::iter::empty::<String>(), callback)
    }

    /// Callback content declaring the captured values it needs.
    ///
    /// Every declared name must be present in the context when the route
    /// matches, otherwise the call fails with a parameter mismatch.
    pub fn callback_with<I, S, F, C>(params: I, callback: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Request, &Context) -> C + Send + Sync + 'static,
        C: Into<Content>,
    {
        Content::Callback {
            params: params.into_iter().map(Into::into).collect(),
            callback: Arc::new(move |request: &Request, context: &Context| {
                callback(request, context).into()
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Content::Empty => "empty",
            Content::Text(_) => "text",
            Content::Bytes(_) => "bytes",
            Content::Json(_) => "json",
            Content::Raise(_) => "raise",
            Content::Callback { .. } => "callback",
        }
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Content::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Content::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Content::Raise(err) => f.debug_tuple("Raise").field(err).finish(),
            Content::Callback { params, .. } => f
                .debug_struct("Callback")
                .field("params", params)
                .finish_non_exhaustive(),
            Content::Empty => f.write_str(self.kind()),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Content {
    fn from(bytes: &[u8; N]) -> Self {
        Content::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Content::Bytes(bytes)
    }
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Json(value)
    }
}

impl From<TransportError> for Content {
    fn from(err: TransportError) -> Self {
        Content::Raise(err)
    }
}

impl From<()> for Content {
    fn from(_: ()) -> Self {
        Content::Empty
    }
}

/// Mutable response skeleton: what a route will answer before its content is
/// resolved. Custom matchers receive one pre-populated from the route's
/// options and may edit it.
#[derive(Debug, Clone)]
pub struct ResponseTemplate {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Applied last, wins over a Content-Type entry in `headers`.
    pub content_type: Option<HeaderValue>,
    pub content: Content,
    /// Values forwarded into content callbacks.
    pub context: Context,
}

impl Default for ResponseTemplate {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_type: None,
            content: Content::Empty,
            context: Context::new(),
        }
    }
}

impl ResponseTemplate {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), UsageError> {
        let (name, value) = crate::message::parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn set_content(&mut self, content: impl Into<Content>) {
        self.content = content.into();
    }
}

/// Turn a template into a concrete response for `request`.
///
/// Callback content is invoked and its result resolved again; `Raise`
/// content is returned unchanged as a transport error.
pub(crate) fn resolve(template: ResponseTemplate, request: &Request) -> Result<Response, MockError> {
    let ResponseTemplate {
        status,
        mut headers,
        content_type,
        mut content,
        context,
    } = template;

    let (body, default_type) = loop {
        match content {
            Content::Callback { params, callback } => {
                check_params(&params, &context)?;
                content = callback(request, &context);
            }
            Content::Raise(err) => return Err(MockError::Transport(err)),
            Content::Empty => break (Bytes::new(), TEXT_PLAIN),
            Content::Text(text) => break (Bytes::from(text), TEXT_PLAIN),
            Content::Bytes(bytes) => break (bytes, TEXT_PLAIN),
            Content::Json(value) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|e| UsageError::InvalidContent(e.to_string()))?;
                break (Bytes::from(body), APPLICATION_JSON);
            }
        }
    };

    match content_type {
        Some(value) => {
            headers.insert(CONTENT_TYPE, value);
        }
        None if !headers.contains_key(CONTENT_TYPE) => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(default_type));
        }
        None => {}
    }

    Ok(Response::new(status, headers, body))
}

fn check_params(params: &[String], context: &Context) -> Result<(), UsageError> {
    let missing: Vec<String> = params
        .iter()
        .filter(|name| !context.contains_key(name))
        .cloned()
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    Err(UsageError::ParameterMismatch {
        missing,
        captured: context.keys().map(str::to_string).collect(),
    })
}
