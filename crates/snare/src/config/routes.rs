//! Declarative route files.
//!
//! A route file carries an optional instance configuration and a list of
//! routes, in YAML or JSON:
//!
//! ```yaml
//! config:
//!   assertAllCalled: false
//! routes:
//!   - method: GET
//!     url: https://foo/bar/
//!     status: 202
//!   - url: { regex: "^https://foo/users/(?P<id>\\d+)/$" }
//!     body: { "ok": true }
//! ```

use super::MockConfig;
use crate::content::Content;
use crate::error::UsageError;
use crate::mock::Mock;
use crate::pattern::{compile_regex, UrlPattern};
use crate::route::{parse_method, Route, RouteOptions};
use anyhow::Context as _;
use hyper::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RouteFile {
    #[serde(default)]
    pub config: MockConfig,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

/// One declarative route.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Any method when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub url: UrlSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// A string is sent as text, anything else as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_through: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UrlSpec {
    Literal(String),
    Regex { regex: String },
}

/// A route that failed to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteIssue {
    pub index: usize,
    pub route: String,
    pub error: UsageError,
}

impl RouteSpec {
    pub fn method(&self) -> Result<Option<Method>, UsageError> {
        self.method.as_deref().map(parse_method).transpose()
    }

    pub fn pattern(&self) -> Result<UrlPattern, UsageError> {
        match &self.url {
            UrlSpec::Literal(url) => Ok(UrlPattern::Literal(url.clone())),
            UrlSpec::Regex { regex } => compile_regex(regex).map(UrlPattern::Regex),
        }
    }

    pub fn options(&self) -> RouteOptions {
        let mut options = RouteOptions::new().headers(self.headers.clone());
        if let Some(status) = self.status {
            options = options.status(status);
        }
        if let Some(content_type) = &self.content_type {
            options = options.content_type(content_type.clone());
        }
        if let Some(body) = &self.body {
            options = options.content(match body {
                Value::String(text) => Content::Text(text.clone()),
                other => Content::Json(other.clone()),
            });
        }
        if let Some(alias) = &self.alias {
            options = options.alias(alias.clone());
        }
        if let Some(pass_through) = self.pass_through {
            options = options.pass_through(pass_through);
        }
        options
    }

    fn describe(&self) -> String {
        let url = match &self.url {
            UrlSpec::Literal(url) => url.clone(),
            UrlSpec::Regex { regex } => format!("/{regex}/"),
        };
        format!("{} {}", self.method.as_deref().unwrap_or("*"), url)
    }
}

impl RouteFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading route file {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("loading route file {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let file: RouteFile = serde_yaml::from_str(contents)?;
        file.config.validate()?;
        Ok(file)
    }

    /// New mock instance with this file's configuration and routes.
    pub fn mock(&self) -> Result<Mock, UsageError> {
        let mock = Mock::with_config(self.config.clone());
        mock.mount(&self.routes)?;
        Ok(mock)
    }

    /// Register every route on a scratch instance and report failures.
    pub fn check(&self) -> Vec<RouteIssue> {
        let mock = Mock::with_config(self.config.clone());
        let issues: Vec<RouteIssue> = self
            .routes
            .iter()
            .enumerate()
            .filter_map(|(index, spec)| {
                mock.mount_spec(spec).err().map(|error| RouteIssue {
                    index,
                    route: spec.describe(),
                    error,
                })
            })
            .collect();
        debug!(
            "Checked {} routes, {} issues",
            self.routes.len(),
            issues.len()
        );
        issues
    }
}

impl Mock {
    /// Register declarative routes in order.
    pub fn mount(&self, specs: &[RouteSpec]) -> Result<Vec<Route>, UsageError> {
        specs.iter().map(|spec| self.mount_spec(spec)).collect()
    }

    pub fn mount_spec(&self, spec: &RouteSpec) -> Result<Route, UsageError> {
        self.register_pattern(spec.method()?, spec.pattern()?, spec.options())
    }
}
