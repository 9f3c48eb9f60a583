//! Configuration types for mock instances.

mod routes;

use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

pub use routes::{RouteFile, RouteIssue, RouteSpec, UrlSpec};

/// Settings recognized on instance construction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Fail `stop()` when a registered route was never called.
    #[serde(default = "default_true")]
    pub assert_all_called: bool,
    /// Fail requests that match no route instead of passing them through.
    #[serde(default = "default_true")]
    pub assert_all_mocked: bool,
    /// Prefix joined onto relative URL patterns at registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            assert_all_called: true,
            assert_all_mocked: true,
            base_url: None,
        }
    }
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert_all_called(mut self, enabled: bool) -> Self {
        self.assert_all_called = enabled;
        self
    }

    pub fn assert_all_mocked(mut self, enabled: bool) -> Self {
        self.assert_all_mocked = enabled;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Load from a YAML (or JSON) file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading mock config {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("loading mock config {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MockConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(base_url) = &self.base_url {
            let uri: hyper::Uri = base_url
                .parse()
                .with_context(|| format!("invalid baseUrl '{base_url}'"))?;
            if uri.scheme().is_none() || uri.authority().is_none() {
                anyhow::bail!("baseUrl '{base_url}' must be an absolute URL with scheme and host");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enforce_coverage() {
        let config = MockConfig::default();
        assert!(config.assert_all_called);
        assert!(config.assert_all_mocked);
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MockConfig::from_yaml_str("assertAllMocked: false\n").unwrap();
        assert!(config.assert_all_called);
        assert!(!config.assert_all_mocked);
    }

    #[test]
    fn test_relative_base_url_rejected() {
        let err = MockConfig::from_yaml_str("baseUrl: /api\n").unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock.yaml");
        std::fs::write(&path, "assertAllCalled: false\nbaseUrl: https://api.example.org\n").unwrap();

        let config = MockConfig::from_file(&path).unwrap();
        assert_eq!(
            config,
            MockConfig::new()
                .assert_all_called(false)
                .base_url("https://api.example.org")
        );
    }
}
