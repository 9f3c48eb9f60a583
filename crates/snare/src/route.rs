//! Registered routes.
//!
//! A route is either pattern based (method + URL pattern) or driven by a
//! custom matcher closure. Each route keeps its own call history, recorded in
//! dispatch order alongside the instance ledger.

use crate::content::{Content, ResponseTemplate};
use crate::error::UsageError;
use crate::ledger::insert_ordered;
use crate::message::{Call, Request};
use crate::pattern::UrlPattern;
use hyper::header::HeaderValue;
use hyper::{Method, StatusCode};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub type CustomMatcher = dyn Fn(&Request, ResponseTemplate) -> Verdict + Send + Sync;

/// Answer of a custom matcher.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Not a match, continue with the next route.
    Skip,
    /// Matched, answer with this (possibly modified) template.
    Respond(ResponseTemplate),
    /// Matched, forward the request to the real transport.
    PassThrough,
    /// A value that is neither a response nor a "no match".
    Unrecognized(String),
}

impl From<ResponseTemplate> for Verdict {
    fn from(template: ResponseTemplate) -> Self {
        Verdict::Respond(template)
    }
}

impl<T: Into<Verdict>> From<Option<T>> for Verdict {
    fn from(value: Option<T>) -> Self {
        value.map_or(Verdict::Skip, Into::into)
    }
}

/// Returning the request itself asks for pass-through.
impl From<Request> for Verdict {
    fn from(_: Request) -> Self {
        Verdict::PassThrough
    }
}

impl From<&Request> for Verdict {
    fn from(_: &Request) -> Self {
        Verdict::PassThrough
    }
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::Skip
    }
}

impl From<bool> for Verdict {
    fn from(value: bool) -> Self {
        if value {
            Verdict::Unrecognized("true".to_string())
        } else {
            Verdict::Skip
        }
    }
}

impl From<&str> for Verdict {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            Verdict::Skip
        } else {
            Verdict::Unrecognized(format!("{value:?}"))
        }
    }
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        Verdict::from(value.as_str())
    }
}

/// Options shared by every registration call.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    status: Option<u16>,
    headers: Vec<(String, String)>,
    content_type: Option<String>,
    content: Content,
    alias: Option<String>,
    pass_through: Option<bool>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response status, 200 when unset.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Content-Type override, applied after `headers`.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn content(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn pass_through(mut self, pass_through: bool) -> Self {
        self.pass_through = Some(pass_through);
        self
    }

    pub(crate) fn alias_ref(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub(crate) fn pass_through_flag(&self) -> Option<bool> {
        self.pass_through
    }

    /// Headers are inserted in order, so a repeated name keeps the last value.
    pub(crate) fn template(&self) -> Result<ResponseTemplate, UsageError> {
        let status = self.status.unwrap_or(200);
        let mut template = ResponseTemplate::new(
            StatusCode::from_u16(status).map_err(|_| UsageError::InvalidStatus(status))?,
        );
        for (name, value) in &self.headers {
            template.set_header(name, value)?;
        }
        template.content_type = self
            .content_type
            .as_deref()
            .map(|value| {
                HeaderValue::from_str(value).map_err(|_| UsageError::InvalidHeader {
                    name: "content-type".to_string(),
                })
            })
            .transpose()?;
        template.content = self.content.clone();
        Ok(template)
    }
}

pub(crate) enum RouteKind {
    Pattern {
        method: Option<Method>,
        url: UrlPattern,
    },
    Matcher(Arc<CustomMatcher>),
}

/// Outcome of evaluating one route against a request.
pub(crate) enum Decision {
    Respond(ResponseTemplate),
    PassThrough,
}

/// Handle to a registered route. Clones share the same call history;
/// equality is identity.
#[derive(Clone)]
pub struct Route {
    inner: Arc<RouteInner>,
}

struct RouteInner {
    id: usize,
    kind: RouteKind,
    template: ResponseTemplate,
    alias: Option<String>,
    pass_through: Option<bool>,
    calls: Mutex<Vec<(u64, Call)>>,
    // Dispatches bound to this route, counted when selected
    claims: AtomicUsize,
}

impl Route {
    pub(crate) fn new(
        id: usize,
        kind: RouteKind,
        template: ResponseTemplate,
        alias: Option<String>,
        pass_through: Option<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                id,
                kind,
                template,
                alias,
                pass_through,
                calls: Mutex::new(Vec::new()),
                claims: AtomicUsize::new(0),
            }),
        }
    }

    /// Registration position within its mock instance.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn alias(&self) -> Option<&str> {
        self.inner.alias.as_deref()
    }

    /// `None` for "any method" and for custom matcher routes.
    pub fn method(&self) -> Option<&Method> {
        match &self.inner.kind {
            RouteKind::Pattern { method, .. } => method.as_ref(),
            RouteKind::Matcher(_) => None,
        }
    }

    /// `None` for custom matcher routes.
    pub fn url(&self) -> Option<&UrlPattern> {
        match &self.inner.kind {
            RouteKind::Pattern { url, .. } => Some(url),
            RouteKind::Matcher(_) => None,
        }
    }

    pub fn pass_through(&self) -> Option<bool> {
        self.inner.pass_through
    }

    pub fn called(&self) -> bool {
        !self.inner.calls.lock().is_empty()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner
            .calls
            .lock()
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn last_call(&self) -> Option<Call> {
        self.inner.calls.lock().last().map(|(_, call)| call.clone())
    }

    /// Alias if set, otherwise method and pattern.
    pub fn describe(&self) -> String {
        if let Some(alias) = &self.inner.alias {
            return alias.clone();
        }
        match &self.inner.kind {
            RouteKind::Pattern { method, url } => format!(
                "{} {}",
                method.as_ref().map_or("*", Method::as_str),
                url.describe()
            ),
            RouteKind::Matcher(_) => format!("custom matcher #{}", self.inner.id),
        }
    }

    /// Method and pattern of a pattern route, used to spot repeated
    /// registrations of the same pattern.
    pub(crate) fn signature(&self) -> Option<(Option<Method>, String)> {
        match &self.inner.kind {
            RouteKind::Pattern { method, url } => Some((method.clone(), url.describe())),
            RouteKind::Matcher(_) => None,
        }
    }

    /// Bind a dispatch to this route.
    pub(crate) fn claim(&self) {
        self.inner.claims.fetch_add(1, Ordering::SeqCst);
    }

    /// Bind the first dispatch only. Returns whether this one was first.
    pub(crate) fn claim_first(&self) -> bool {
        self.inner
            .claims
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn record(&self, seq: u64, call: Call) {
        insert_ordered(&mut self.inner.calls.lock(), seq, call);
    }

    /// Evaluate against a request. Usage errors abort the dispatch.
    pub(crate) fn evaluate(&self, request: &Request) -> Result<Option<Decision>, UsageError> {
        match &self.inner.kind {
            RouteKind::Pattern { method, url } => {
                if let Some(method) = method {
                    if !method.as_str().eq_ignore_ascii_case(request.method().as_str()) {
                        return Ok(None);
                    }
                }
                let Some(context) = url.matches(request.url())? else {
                    return Ok(None);
                };
                if self.inner.pass_through == Some(true) {
                    return Ok(Some(Decision::PassThrough));
                }
                let mut template = self.inner.template.clone();
                template.context = context;
                Ok(Some(Decision::Respond(template)))
            }
            RouteKind::Matcher(matcher) => match matcher(request, self.inner.template.clone()) {
                Verdict::Skip => Ok(None),
                Verdict::Respond(template) => Ok(Some(Decision::Respond(template))),
                Verdict::PassThrough => Ok(Some(Decision::PassThrough)),
                Verdict::Unrecognized(value) => Err(UsageError::InvalidMatcherResult(value)),
            },
        }
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Route {}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.inner.id)
            .field("route", &self.describe())
            .field("pass_through", &self.inner.pass_through)
            .field("call_count", &self.call_count())
            .finish()
    }
}

pub(crate) fn parse_method(method: &str) -> Result<Method, UsageError> {
    Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| UsageError::InvalidMethod(method.to_string()))
}
