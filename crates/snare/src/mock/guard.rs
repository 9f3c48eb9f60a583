use super::Mock;
use crate::error::AssertionError;
use std::ops::Deref;
use tracing::warn;

/// Keeps a mock instance active for a scope.
///
/// Call [`MockGuard::finish`] to stop the instance and get the coverage result
/// as an error. A guard dropped without `finish` stops the instance too and
/// panics if coverage fails, unless the thread is already unwinding.
#[must_use = "the mock stops intercepting when the guard is dropped"]
pub struct MockGuard {
    mock: Mock,
    armed: bool,
}

impl MockGuard {
    pub(crate) fn new(mock: Mock) -> Self {
        Self { mock, armed: true }
    }

    pub fn mock(&self) -> &Mock {
        &self.mock
    }

    /// Stop the instance, resetting it, and report coverage.
    pub fn finish(mut self) -> Result<(), AssertionError> {
        self.armed = false;
        self.mock.stop()
    }

    /// Stop the instance, resetting it, without the coverage check.
    pub(crate) fn discard(mut self) {
        self.armed = false;
        self.mock.stop_unchecked(true);
    }
}

impl Deref for MockGuard {
    type Target = Mock;

    fn deref(&self) -> &Mock {
        &self.mock
    }
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if std::thread::panicking() {
            self.mock.stop_unchecked(true);
            return;
        }
        if let Err(err) = self.mock.stop() {
            warn!("Mock guard dropped with failed assertion: {}", err);
            panic!("{err}");
        }
    }
}
