//! The process-wide default instance.
//!
//! Module-level registration and inspection functions are thin forwards to a
//! lazily created [`Mock`] with the default configuration, shared by every
//! caller in the process.

use super::{Mock, Stats};
use crate::config::MockConfig;
use crate::content::ResponseTemplate;
use crate::error::{AssertionError, MockError, UsageError};
use crate::message::{Call, Request};
use crate::pattern::UrlPattern;
use crate::route::{Route, RouteOptions, Verdict};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::future::Future;

static GLOBAL: Lazy<Mock> = Lazy::new(Mock::new);

/// The global instance.
pub fn global() -> &'static Mock {
    &GLOBAL
}

pub fn request(
    method: impl AsRef<str>,
    url: impl Into<UrlPattern>,
    options: RouteOptions,
) -> Result<Route, UsageError> {
    GLOBAL.request(method, url, options)
}

pub fn any(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.any(url, options)
}

pub fn get(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.get(url, options)
}

pub fn post(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.post(url, options)
}

pub fn put(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.put(url, options)
}

pub fn patch(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.patch(url, options)
}

pub fn delete(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.delete(url, options)
}

pub fn head(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.head(url, options)
}

pub fn options(url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
    GLOBAL.options(url, options)
}

pub fn matcher<F, V>(matcher: F, options: RouteOptions) -> Result<Route, UsageError>
where
    F: Fn(&Request, ResponseTemplate) -> V + Send + Sync + 'static,
    V: Into<Verdict>,
{
    GLOBAL.matcher(matcher, options)
}

pub fn calls() -> Vec<Call> {
    GLOBAL.calls()
}

pub fn stats() -> Stats {
    GLOBAL.stats()
}

pub fn aliases() -> HashMap<String, Route> {
    GLOBAL.aliases()
}

pub fn route(alias: &str) -> Option<Route> {
    GLOBAL.route(alias)
}

pub fn start() -> Result<(), UsageError> {
    GLOBAL.start()
}

pub fn stop() -> Result<(), AssertionError> {
    GLOBAL.stop()
}

pub fn stop_with(reset: bool) -> Result<(), AssertionError> {
    GLOBAL.stop_with(reset)
}

pub fn reset() {
    GLOBAL.reset()
}

/// Run `f` with the global instance active.
pub fn mocked<T>(f: impl FnOnce(&Mock) -> T) -> Result<T, MockError> {
    GLOBAL.run(f)
}

pub async fn mocked_async<F, Fut, T>(f: F) -> Result<T, MockError>
where
    F: FnOnce(Mock) -> Fut,
    Fut: Future<Output = T>,
{
    GLOBAL.run_async(f).await
}

/// Fallible variant of [`mocked`]: an `Err` from `f` wins over coverage.
pub fn try_mocked<T, E>(f: impl FnOnce(&Mock) -> Result<T, E>) -> Result<T, E>
where
    E: From<MockError>,
{
    GLOBAL.try_run(f)
}

pub async fn try_mocked_async<F, Fut, T, E>(f: F) -> Result<T, E>
where
    F: FnOnce(Mock) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<MockError>,
{
    GLOBAL.try_run_async(f).await
}

/// Run `f` with a fresh local instance built from `config`.
pub fn with_mock<T>(config: MockConfig, f: impl FnOnce(&Mock) -> T) -> Result<T, MockError> {
    Mock::with_config(config).run(f)
}

pub async fn with_mock_async<F, Fut, T>(config: MockConfig, f: F) -> Result<T, MockError>
where
    F: FnOnce(Mock) -> Fut,
    Fut: Future<Output = T>,
{
    Mock::with_config(config).run_async(f).await
}

pub fn try_with_mock<T, E>(config: MockConfig, f: impl FnOnce(&Mock) -> Result<T, E>) -> Result<T, E>
where
    E: From<MockError>,
{
    Mock::with_config(config).try_run(f)
}

pub async fn try_with_mock_async<F, Fut, T, E>(config: MockConfig, f: F) -> Result<T, E>
where
    F: FnOnce(Mock) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<MockError>,
{
    Mock::with_config(config).try_run_async(f).await
}
