//! Mock instances.
//!
//! This module provides:
//! - `Mock`: registry, ledger and lifecycle of one interception instance
//! - `MockGuard`: scoped activation that stops the instance on drop
//! - `global`: the process-wide default instance and module-level helpers
//!
//! A mock is inactive until `start()` installs it in the hook slot; `stop()`
//! uninstalls it, checks route coverage and (by default) clears its state.

mod guard;
pub mod global;


pub use guard::MockGuard;

use crate::config::MockConfig;
use crate::content::{resolve, ResponseTemplate};
use crate::error::{AssertionError, MockError, UsageError};
use crate::ledger::Ledger;
use crate::message::{Call, Request, Response};
use crate::pattern::UrlPattern;
use crate::registry::{self, Registry};
use crate::route::{parse_method, Decision, Route, RouteKind, RouteOptions, Verdict};
use crate::transport::{hook, Interceptor, Transport};
use async_trait::async_trait;
use hyper::Method;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

static NEXT_MOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Call statistics of a mock instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub call_count: usize,
}

/// Handle to a mock instance. Clones share the same state.
#[derive(Clone)]
pub struct Mock {
    inner: Arc<MockInner>,
}

struct MockInner {
    id: u64,
    config: MockConfig,
    registry: RwLock<Registry>,
    ledger: Ledger,
    active: Mutex<bool>,
}

impl Default for Mock {
    fn default() -> Self {
        Self::new()
    }
}

impl Mock {
    /// Instance with the default configuration (both assertions enabled).
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Instance with `config`.
    ///
    /// A `base_url` that is not absolute makes every pattern registration
    /// fail with [`UsageError::InvalidBaseUrl`].
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            inner: Arc::new(MockInner {
                id: NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed),
                config,
                registry: RwLock::new(Registry::new()),
                ledger: Ledger::new(),
                active: Mutex::new(false),
            }),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    // ===== Registration =====

    /// Register a route for `method` (case-insensitive) and `url`.
    pub fn request(
        &self,
        method: impl AsRef<str>,
        url: impl Into<UrlPattern>,
        options: RouteOptions,
    ) -> Result<Route, UsageError> {
        let method = parse_method(method.as_ref())?;
        self.register_pattern(Some(method), url.into(), options)
    }

    /// Register a route matching `url` with any method.
    pub fn any(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(None, url.into(), options)
    }

    pub fn get(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::GET), url.into(), options)
    }

    pub fn post(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::POST), url.into(), options)
    }

    pub fn put(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::PUT), url.into(), options)
    }

    pub fn patch(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::PATCH), url.into(), options)
    }

    pub fn delete(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::DELETE), url.into(), options)
    }

    pub fn head(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::HEAD), url.into(), options)
    }

    pub fn options(&self, url: impl Into<UrlPattern>, options: RouteOptions) -> Result<Route, UsageError> {
        self.register_pattern(Some(Method::OPTIONS), url.into(), options)
    }

    /// Register a custom matcher route.
    ///
    /// The matcher receives the request and a response template populated
    /// from `options`; it answers with anything convertible to a [`Verdict`]:
    /// the (edited) template to respond, the request to pass through, or a
    /// falsy value (`None`, `false`) to let the next route try.
    pub fn matcher<F, V>(&self, matcher: F, options: RouteOptions) -> Result<Route, UsageError>
    where
        F: Fn(&Request, ResponseTemplate) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        let kind = RouteKind::Matcher(Arc::new(move |request: &Request, template: ResponseTemplate| {
            matcher(request, template).into()
        }));
        self.register(kind, options)
    }

    pub(crate) fn register_pattern(
        &self,
        method: Option<Method>,
        url: UrlPattern,
        options: RouteOptions,
    ) -> Result<Route, UsageError> {
        let url = url.with_base_url(self.inner.config.base_url.as_deref())?;
        self.register(RouteKind::Pattern { method, url }, options)
    }

    fn register(&self, kind: RouteKind, options: RouteOptions) -> Result<Route, UsageError> {
        let template = options.template()?;
        let alias = options.alias_ref().map(str::to_string);
        let pass_through = options.pass_through_flag();
        let route = self
            .inner
            .registry
            .write()
            .add(kind, template, alias, pass_through)?;
        debug!("Registered route #{}: {}", route.id(), route.describe());
        Ok(route)
    }

    // ===== Inspection =====

    /// Every dispatched call, in dispatch order, whichever route matched.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.ledger.calls()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            call_count: self.inner.ledger.len(),
        }
    }

    pub fn routes(&self) -> Vec<Route> {
        self.inner.registry.read().snapshot()
    }

    /// Route registered under `alias`.
    pub fn route(&self, alias: &str) -> Option<Route> {
        self.inner.registry.read().alias(alias)
    }

    pub fn aliases(&self) -> HashMap<String, Route> {
        self.inner.registry.read().aliases()
    }

    pub fn is_active(&self) -> bool {
        *self.inner.active.lock()
    }

    // ===== Lifecycle =====

    /// Install this instance as the interceptor for all clients.
    pub fn start(&self) -> Result<(), UsageError> {
        let mut active = self.inner.active.lock();
        if *active {
            return Err(UsageError::AlreadyActive);
        }
        let interceptor: Arc<dyn Interceptor> = self.inner.clone();
        hook::install(self.inner.id, &interceptor);
        *active = true;
        info!(
            "Mock {} started with {} routes",
            self.inner.id,
            self.inner.registry.read().len()
        );
        Ok(())
    }

    /// Stop intercepting, check coverage and clear all state.
    pub fn stop(&self) -> Result<(), AssertionError> {
        self.stop_with(true)
    }

    /// Stop intercepting and check coverage; clear state only when `reset`.
    ///
    /// Deactivation and reset happen even when the coverage check fails.
    pub fn stop_with(&self, reset: bool) -> Result<(), AssertionError> {
        let checked = if self.inner.config.assert_all_called {
            self.assert_all_called()
        } else {
            Ok(())
        };
        self.deactivate(reset);
        checked
    }

    /// Stop without the coverage check.
    pub(crate) fn stop_unchecked(&self, reset: bool) {
        self.deactivate(reset);
    }

    fn deactivate(&self, reset: bool) {
        let mut active = self.inner.active.lock();
        if *active {
            hook::uninstall(self.inner.id);
            *active = false;
            info!(
                "Mock {} stopped after {} calls",
                self.inner.id,
                self.inner.ledger.len()
            );
        }
        if reset {
            self.reset();
        }
    }

    /// Clear routes, aliases and the ledger.
    pub fn reset(&self) {
        self.inner.registry.write().clear();
        self.inner.ledger.clear();
    }

    /// Fail listing every route that was never called.
    pub fn assert_all_called(&self) -> Result<(), AssertionError> {
        let uncalled = self.inner.registry.read().uncalled();
        if uncalled.is_empty() {
            return Ok(());
        }
        let routes: Vec<String> = uncalled.iter().map(Route::describe).collect();
        warn!("Mock {}: {} routes never called", self.inner.id, routes.len());
        Err(AssertionError::NotCalled(routes))
    }

    /// Start and return a guard that stops the instance when dropped.
    pub fn activate(&self) -> Result<MockGuard, UsageError> {
        self.start()?;
        Ok(MockGuard::new(self.clone()))
    }

    /// Run `f` with the instance active, then stop it.
    pub fn run<T>(&self, f: impl FnOnce(&Mock) -> T) -> Result<T, MockError> {
        let guard = self.activate()?;
        let output = f(guard.mock());
        guard.finish()?;
        Ok(output)
    }

    /// Async variant of [`Mock::run`].
    pub async fn run_async<F, Fut, T>(&self, f: F) -> Result<T, MockError>
    where
        F: FnOnce(Mock) -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.activate()?;
        let output = f(self.clone()).await;
        guard.finish()?;
        Ok(output)
    }

    /// Run a fallible `f` with the instance active, then stop it.
    ///
    /// An `Err` from `f` is returned unchanged and the coverage check is
    /// skipped for it. Usage and coverage failures convert into `E`.
    pub fn try_run<T, E>(&self, f: impl FnOnce(&Mock) -> Result<T, E>) -> Result<T, E>
    where
        E: From<MockError>,
    {
        let guard = self.activate().map_err(|e| E::from(MockError::from(e)))?;
        match f(guard.mock()) {
            Ok(output) => {
                guard.finish().map_err(|e| E::from(MockError::from(e)))?;
                Ok(output)
            }
            Err(err) => {
                guard.discard();
                Err(err)
            }
        }
    }

    /// Async variant of [`Mock::try_run`].
    pub async fn try_run_async<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(Mock) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<MockError>,
    {
        let guard = self.activate().map_err(|e| E::from(MockError::from(e)))?;
        match f(self.clone()).await {
            Ok(output) => {
                guard.finish().map_err(|e| E::from(MockError::from(e)))?;
                Ok(output)
            }
            Err(err) => {
                guard.discard();
                Err(err)
            }
        }
    }

    // ===== Dispatch =====

    /// Answer `request` from the registered routes.
    ///
    /// `transport` is used for pass-through routes and, when
    /// `assert_all_mocked` is disabled, for requests no route matches.
    pub async fn dispatch(
        &self,
        request: Request,
        transport: &dyn Transport,
    ) -> Result<Response, MockError> {
        self.inner.dispatch(request, transport).await
    }
}

impl MockInner {
    async fn dispatch(&self, request: Request, transport: &dyn Transport) -> Result<Response, MockError> {
        let routes = self.registry.read().snapshot();

        match registry::select(&routes, &request)? {
            Some((route, Decision::Respond(template))) => {
                debug!(
                    "Route {} matched {} {}",
                    route.describe(),
                    request.method(),
                    request.url()
                );
                let seq = self.ledger.reserve();
                let outcome = resolve(template, &request);
                self.ledger.record(
                    seq,
                    Some(&route),
                    Call {
                        request,
                        response: outcome.as_ref().ok().cloned(),
                    },
                );
                outcome
            }
            Some((route, Decision::PassThrough)) => {
                debug!(
                    "Route {} passes {} {} through",
                    route.describe(),
                    request.method(),
                    request.url()
                );
                self.pass_through(Some(route), request, transport).await
            }
            None if self.config.assert_all_mocked => {
                warn!("No route matched {} {}", request.method(), request.url());
                Err(AssertionError::NotMocked {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                }
                .into())
            }
            None => {
                debug!(
                    "No route matched {} {}, passing through",
                    request.method(),
                    request.url()
                );
                self.pass_through(None, request, transport).await
            }
        }
    }

    /// Forward to the real transport and record its outcome at the position
    /// reserved before the await.
    async fn pass_through(
        &self,
        route: Option<Route>,
        request: Request,
        transport: &dyn Transport,
    ) -> Result<Response, MockError> {
        let seq = self.ledger.reserve();
        let outcome = transport.send(request.clone()).await;
        self.ledger.record(
            seq,
            route.as_ref(),
            Call {
                request,
                response: outcome.as_ref().ok().cloned(),
            },
        );
        Ok(outcome?)
    }
}

#[async_trait]
impl Interceptor for MockInner {
    async fn intercept(&self, request: Request, transport: &dyn Transport) -> Result<Response, MockError> {
        self.dispatch(request, transport).await
    }
}
