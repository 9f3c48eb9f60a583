//! Ordered route registry and first-match selection.

use crate::content::ResponseTemplate;
use crate::error::UsageError;
use crate::message::Request;
use crate::route::{Decision, Route, RouteKind};
use std::collections::HashMap;

/// Routes in registration order plus the alias table.
#[derive(Default)]
pub(crate) struct Registry {
    routes: Vec<Route>,
    aliases: HashMap<String, Route>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        kind: RouteKind,
        template: ResponseTemplate,
        alias: Option<String>,
        pass_through: Option<bool>,
    ) -> Result<Route, UsageError> {
        if let Some(alias) = &alias {
            if self.aliases.contains_key(alias) {
                return Err(UsageError::DuplicateAlias(alias.clone()));
            }
        }

        let route = Route::new(self.routes.len(), kind, template, alias, pass_through);
        if let Some(alias) = route.alias() {
            self.aliases.insert(alias.to_string(), route.clone());
        }
        self.routes.push(route.clone());
        Ok(route)
    }

    /// Cloned handles, so dispatch can evaluate without holding the lock.
    pub fn snapshot(&self) -> Vec<Route> {
        self.routes.clone()
    }

    pub fn alias(&self, name: &str) -> Option<Route> {
        self.aliases.get(name).cloned()
    }

    pub fn aliases(&self) -> HashMap<String, Route> {
        self.aliases.clone()
    }

    pub fn uncalled(&self) -> Vec<Route> {
        self.routes.iter().filter(|r| !r.called()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
        self.aliases.clear();
    }
}

/// First route, in registration order, whose predicate accepts the request.
///
/// Identical pattern routes registered again answer in sequence: each one
/// takes the first dispatch selected for it, and the last one keeps
/// answering once all of them have been taken. A route is taken when it is
/// selected, before any pass-through completes.
pub(crate) fn select(
    routes: &[Route],
    request: &Request,
) -> Result<Option<(Route, Decision)>, UsageError> {
    for (index, route) in routes.iter().enumerate() {
        let Some(decision) = route.evaluate(request)? else {
            continue;
        };
        let Some(signature) = route.signature() else {
            route.claim();
            return Ok(Some((route.clone(), decision)));
        };
        if route.claim_first() {
            return Ok(Some((route.clone(), decision)));
        }

        let repeats: Vec<&Route> = routes[index + 1..]
            .iter()
            .filter(|later| later.signature().as_ref() == Some(&signature))
            .collect();
        for later in &repeats {
            if let Some(later_decision) = later.evaluate(request)? {
                if later.claim_first() {
                    return Ok(Some(((*later).clone(), later_decision)));
                }
            }
        }
        if let Some(last) = repeats.last() {
            if let Some(last_decision) = last.evaluate(request)? {
                last.claim();
                return Ok(Some(((*last).clone(), last_decision)));
            }
        }
        route.claim();
        return Ok(Some((route.clone(), decision)));
    }
    Ok(None)
}
