//! Normalized request and response types exchanged with the client adapter.

use crate::error::UsageError;
use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Method, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Outbound request as seen by the interception engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Build a request for an absolute URL.
    ///
    /// The URL used for matching is the canonical form of the parsed URI, so
    /// `https://foo` becomes `https://foo/`.
    pub fn new(method: Method, url: &str) -> Result<Self, UsageError> {
        let uri = url.parse::<Uri>().map_err(|e| UsageError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(UsageError::InvalidUrl {
                url: url.to_string(),
                reason: "URL must be absolute".to_string(),
            });
        }

        Ok(Self {
            method,
            url: uri.to_string(),
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, UsageError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(self)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body and the matching Content-Type.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, UsageError> {
        let body =
            serde_json::to_vec(value).map_err(|e| UsageError::InvalidContent(e.to_string()))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Bytes::from(body);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full URL string (scheme, host, path and query).
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn host(&self) -> Option<&str> {
        self.uri.host()
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

/// Response handed back to the caller, synthesized or real.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Values captured while matching a request, forwarded into content
/// resolution: regex named groups, or anything a custom matcher inserts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Value rendered as text: strings verbatim, anything else as JSON.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One recorded dispatch. `response` is `None` when the call raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub request: Request,
    pub response: Option<Response>,
}

pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), UsageError> {
    let invalid = || UsageError::InvalidHeader {
        name: name.to_string(),
    };
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
    let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((name, value))
}
