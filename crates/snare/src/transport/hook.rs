//! Process-wide interception hook slot.
//!
//! Installed interceptors form a stack: the most recently installed one
//! receives requests. The slot holds weak references, so an instance that is
//! dropped while still installed stops intercepting. The lock is held only to
//! swap or upgrade entries, never while a request is in flight.

use super::Interceptor;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::debug;

static HOOKS: Lazy<RwLock<Vec<(u64, Weak<dyn Interceptor>)>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Install `hook` under `id`, replacing a previous installation of that id.
pub fn install(id: u64, hook: &Arc<dyn Interceptor>) {
    let mut hooks = HOOKS.write();
    hooks.retain(|(existing, entry)| *existing != id && entry.strong_count() > 0);
    hooks.push((id, Arc::downgrade(hook)));
    debug!("Interceptor {} installed ({} active)", id, hooks.len());
}

/// Remove the hook installed under `id`. Returns whether one was installed.
pub fn uninstall(id: u64) -> bool {
    let mut hooks = HOOKS.write();
    let before = hooks.len();
    hooks.retain(|(existing, _)| *existing != id);
    let removed = hooks.len() != before;
    if removed {
        debug!("Interceptor {} uninstalled ({} active)", id, hooks.len());
    }
    removed
}

/// The interceptor requests should go to, if any.
///
/// Entries whose instance has been dropped are skipped and pruned.
pub fn current() -> Option<Arc<dyn Interceptor>> {
    {
        let hooks = HOOKS.read();
        match hooks.last() {
            None => return None,
            Some((_, entry)) => {
                if let Some(hook) = entry.upgrade() {
                    return Some(hook);
                }
            }
        }
    }

    let mut hooks = HOOKS.write();
    while let Some((id, entry)) = hooks.last() {
        if let Some(hook) = entry.upgrade() {
            return Some(hook);
        }
        debug!("Interceptor {} dropped while installed", id);
        hooks.pop();
    }
    None
}

pub fn is_installed(id: u64) -> bool {
    HOOKS
        .read()
        .iter()
        .any(|(existing, entry)| *existing == id && entry.strong_count() > 0)
}
