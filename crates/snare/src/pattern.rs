//! URL pattern matching.
//!
//! A route's URL pattern is compiled once at registration and evaluated against
//! the full URL string of each request. Regex patterns forward their named
//! groups as the [`Context`] used by content resolution.

use crate::error::UsageError;
use crate::message::Context;
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// User-supplied URL matcher for cases the built-in patterns don't cover.
pub trait UrlMatcher: Send + Sync + fmt::Debug {
    /// `Ok(Some(context))` on match, `Ok(None)` when the URL doesn't match.
    fn match_url(&self, url: &str) -> Result<Option<Context>, UsageError>;
}

/// URL pattern of a route.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact string equality against the full URL.
    Literal(String),
    /// Regex matched at the start of the full URL; named groups are captured.
    Regex(Regex),
    /// Structural equality. Only JSON strings are comparable to a URL.
    Value(Value),
    Custom(Arc<dyn UrlMatcher>),
}

impl UrlPattern {
    /// Compile a regex pattern.
    pub fn regex(pattern: &str) -> Result<Self, UsageError> {
        compile_regex(pattern).map(UrlPattern::Regex)
    }

    pub fn custom(matcher: impl UrlMatcher + 'static) -> Self {
        UrlPattern::Custom(Arc::new(matcher))
    }

    /// Evaluate the pattern against a full URL string.
    pub fn matches(&self, url: &str) -> Result<Option<Context>, UsageError> {
        match self {
            UrlPattern::Literal(literal) => Ok((literal == url).then(Context::new)),
            UrlPattern::Regex(regex) => Ok(regex_captures(regex, url)),
            UrlPattern::Value(Value::String(literal)) => Ok((literal == url).then(Context::new)),
            UrlPattern::Value(other) => Err(UsageError::InvalidUrlPattern(other.to_string())),
            UrlPattern::Custom(matcher) => matcher.match_url(url),
        }
    }

    /// Resolve a relative pattern against `base_url`.
    ///
    /// Literal patterns without a scheme are joined onto the base; regex
    /// patterns without a scheme are prefixed with the escaped base. The base
    /// itself must be absolute.
    pub(crate) fn with_base_url(self, base_url: Option<&str>) -> Result<Self, UsageError> {
        let Some(base) = base_url else {
            return Ok(self);
        };
        check_base_url(base)?;

        match self {
            UrlPattern::Literal(literal) if !has_scheme(&literal) => {
                Ok(UrlPattern::Literal(join_url(base, &literal)))
            }
            UrlPattern::Value(Value::String(literal)) if !has_scheme(&literal) => {
                Ok(UrlPattern::Value(Value::String(join_url(base, &literal))))
            }
            UrlPattern::Regex(regex) if !has_scheme(regex.as_str()) => {
                let source = regex.as_str().trim_start_matches('^');
                let joined = format!(
                    "^{}{}",
                    regex::escape(base.trim_end_matches('/')),
                    if source.starts_with('/') {
                        source.to_string()
                    } else {
                        format!("/{source}")
                    }
                );
                UrlPattern::regex(&joined)
            }
            other => Ok(other),
        }
    }

    /// Human readable form used in logs and assertion messages.
    pub fn describe(&self) -> String {
        match self {
            UrlPattern::Literal(literal) => literal.clone(),
            UrlPattern::Regex(regex) => format!("/{}/", regex.as_str()),
            UrlPattern::Value(value) => value.to_string(),
            UrlPattern::Custom(matcher) => format!("{matcher:?}"),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(url: &str) -> Self {
        UrlPattern::Literal(url.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(url: String) -> Self {
        UrlPattern::Literal(url)
    }
}

impl From<Regex> for UrlPattern {
    fn from(regex: Regex) -> Self {
        UrlPattern::Regex(regex)
    }
}

impl From<&Regex> for UrlPattern {
    fn from(regex: &Regex) -> Self {
        UrlPattern::Regex(regex.clone())
    }
}

impl From<Value> for UrlPattern {
    fn from(value: Value) -> Self {
        UrlPattern::Value(value)
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Result<Regex, UsageError> {
    Regex::new(pattern).map_err(|e| UsageError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Captures of a match starting at offset 0, named groups only.
fn regex_captures(regex: &Regex, url: &str) -> Option<Context> {
    let captures = regex.captures(url)?;
    // Leftmost-first search: a match at offset 0 is found if one exists
    if captures.get(0)?.start() != 0 {
        return None;
    }

    let mut context = Context::new();
    for name in regex.capture_names().flatten() {
        if let Some(group) = captures.name(name) {
            context.insert(name, group.as_str());
        }
    }
    Some(context)
}

fn check_base_url(base: &str) -> Result<(), UsageError> {
    let uri = base.parse::<hyper::Uri>().map_err(|e| UsageError::InvalidBaseUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(UsageError::InvalidBaseUrl {
            url: base.to_string(),
            reason: "must be absolute with scheme and host".to_string(),
        });
    }
    Ok(())
}

/// Regex sources may escape their slashes (`https:\/\/`).
fn has_scheme(pattern: &str) -> bool {
    pattern.replace(r"\/", "/").contains("://")
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
