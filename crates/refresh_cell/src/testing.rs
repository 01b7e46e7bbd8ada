// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock value loader for testing.
//!
//! This module provides `MockLoader`, a scriptable [`ValueLoader`] that records
//! every call made by a cache cell and hands out reload handles that the test
//! resolves explicitly.

use std::{fmt::Debug, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{Error, FailedReloadAction, ReloadCompleter, ReloadHandle, Result, ValueLoader, reload_channel};

/// Recorded loader call with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderOp<T> {
    /// `load()` was called.
    Load,
    /// `reload()` was called with the given stale value.
    Reload(T),
    /// `on_reload_failure()` was called.
    ReloadFailure {
        /// Display text of the failure cause.
        cause: String,
        /// Age of the cached value.
        age: Duration,
        /// Consecutive failure count.
        fail_count: u32,
    },
    /// `on_reload_timeout()` was called.
    ReloadTimeout {
        /// Age of the cached value.
        age: Duration,
        /// Consecutive failure count.
        fail_count: u32,
    },
}

/// The decision a [`MockLoader`] policy hook makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAction {
    /// Answer with [`FailedReloadAction::Ignore`].
    Ignore,
    /// Answer with [`FailedReloadAction::Remove`].
    Remove,
    /// Answer with [`FailedReloadAction::Retry`] carrying a fresh reload handle.
    Retry,
    /// Fail the hook itself with an error.
    Fail,
}

type Policy = Box<dyn FnMut(u32) -> MockAction + Send>;

struct MockState<T> {
    load_value: Option<T>,
    fail_reload_start: bool,
    operations: Vec<LoaderOp<T>>,
    completers: Vec<Option<ReloadCompleter<T>>>,
    on_failure: Policy,
    on_timeout: Policy,
}

/// A scriptable loader for testing cache cells.
///
/// Clones share state, so a test can keep one clone for inspection while the
/// cell owns another.
///
/// Every reload attempt, whether started through `reload()` or issued by a
/// [`MockAction::Retry`] decision, gets a sequential attempt index starting at
/// zero. Tests resolve attempts by index or resolve the latest one.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use refresh_cell::CacheCell;
/// use refresh_cell::testing::{LoaderOp, MockLoader};
/// use tick::ClockControl;
///
/// let control = ClockControl::new();
/// let loader = MockLoader::new(1);
/// let mut cell = CacheCell::new(control.to_clock(), Duration::from_millis(100), loader.clone());
///
/// assert_eq!(cell.get()?, 1);
///
/// control.advance(Duration::from_millis(101));
/// assert_eq!(cell.get()?, 1);
/// assert_eq!(loader.operations(), vec![LoaderOp::Load, LoaderOp::Reload(1)]);
///
/// loader.succeed_latest(2);
/// assert_eq!(cell.get()?, 2);
/// # Ok::<(), refresh_cell::Error>(())
/// ```
pub struct MockLoader<T> {
    state: Arc<Mutex<MockState<T>>>,
}

impl<T> Debug for MockLoader<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockLoader")
            .field("load_value", &state.load_value)
            .field("operations", &state.operations)
            .field("reload_attempts", &state.completers.len())
            .finish_non_exhaustive()
    }
}

impl<T> Clone for MockLoader<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> MockLoader<T> {
    /// Creates a loader whose `load()` returns `value` and whose policy hooks answer `Ignore`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                load_value: Some(value),
                fail_reload_start: false,
                operations: Vec::new(),
                completers: Vec::new(),
                on_failure: Box::new(|_| MockAction::Ignore),
                on_timeout: Box::new(|_| MockAction::Ignore),
            })),
        }
    }

    /// Changes the value returned by subsequent `load()` calls.
    pub fn set_load_value(&self, value: T) {
        self.state.lock().load_value = Some(value);
    }

    /// Makes subsequent `load()` calls fail.
    pub fn fail_loads(&self) {
        self.state.lock().load_value = None;
    }

    /// Makes subsequent `reload()` calls fail before returning a handle.
    pub fn fail_reload_start(&self, fail: bool) {
        self.state.lock().fail_reload_start = fail;
    }

    /// Sets the decision made by `on_reload_failure()`, given the failure count.
    pub fn on_failure<F>(&self, policy: F)
    where
        F: FnMut(u32) -> MockAction + Send + 'static,
    {
        self.state.lock().on_failure = Box::new(policy);
    }

    /// Sets the decision made by `on_reload_timeout()`, given the failure count.
    pub fn on_timeout<F>(&self, policy: F)
    where
        F: FnMut(u32) -> MockAction + Send + 'static,
    {
        self.state.lock().on_timeout = Box::new(policy);
    }

    /// Returns the number of reload attempts handed out so far.
    #[must_use]
    pub fn reload_attempts(&self) -> usize {
        self.state.lock().completers.len()
    }

    /// Resolves reload attempt `index` with `value`.
    ///
    /// Returns `false` if the attempt does not exist or was already resolved.
    pub fn succeed_reload(&self, index: usize, value: T) -> bool {
        self.complete(index, Ok(value))
    }

    /// Resolves reload attempt `index` with an error carrying `message`.
    ///
    /// Returns `false` if the attempt does not exist or was already resolved.
    pub fn fail_reload(&self, index: usize, message: &'static str) -> bool {
        self.complete(index, Err(Error::from_message(message)))
    }

    /// Resolves the most recent reload attempt with `value`.
    pub fn succeed_latest(&self, value: T) -> bool {
        match self.reload_attempts().checked_sub(1) {
            Some(index) => self.succeed_reload(index, value),
            None => false,
        }
    }

    /// Resolves the most recent reload attempt with an error carrying `message`.
    pub fn fail_latest(&self, message: &'static str) -> bool {
        match self.reload_attempts().checked_sub(1) {
            Some(index) => self.fail_reload(index, message),
            None => false,
        }
    }

    /// Drops the completer of reload attempt `index` without resolving it.
    pub fn abandon_reload(&self, index: usize) -> bool {
        self.state.lock().completers.get_mut(index).and_then(Option::take).is_some()
    }

    fn complete(&self, index: usize, result: Result<T>) -> bool {
        let completer = self.state.lock().completers.get_mut(index).and_then(Option::take);
        match completer {
            Some(completer) => {
                completer.complete(result);
                true
            }
            None => false,
        }
    }

    fn issue_handle(state: &mut MockState<T>) -> ReloadHandle<T> {
        let (completer, handle) = reload_channel();
        state.completers.push(Some(completer));
        handle
    }

    fn decide(state: &mut MockState<T>, action: MockAction) -> Result<FailedReloadAction<ReloadHandle<T>>> {
        match action {
            MockAction::Ignore => Ok(FailedReloadAction::Ignore),
            MockAction::Remove => Ok(FailedReloadAction::Remove),
            MockAction::Retry => Ok(FailedReloadAction::Retry(Self::issue_handle(state))),
            MockAction::Fail => Err(Error::from_message("mock policy hook failed")),
        }
    }
}

impl<T: Clone> MockLoader<T> {
    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<LoaderOp<T>> {
        self.state.lock().operations.clone()
    }

    /// Returns the number of `load()` calls.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.count(|op| matches!(op, LoaderOp::Load))
    }

    /// Returns the number of `reload()` calls.
    #[must_use]
    pub fn reload_count(&self) -> usize {
        self.count(|op| matches!(op, LoaderOp::Reload(_)))
    }

    /// Returns the failure counts passed to the policy hooks, in call order.
    #[must_use]
    pub fn reported_fail_counts(&self) -> Vec<u32> {
        self.state
            .lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                LoaderOp::ReloadFailure { fail_count, .. } | LoaderOp::ReloadTimeout { fail_count, .. } => Some(*fail_count),
                LoaderOp::Load | LoaderOp::Reload(_) => None,
            })
            .collect()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.state.lock().operations.clear();
    }

    fn count(&self, predicate: impl Fn(&LoaderOp<T>) -> bool) -> usize {
        self.state.lock().operations.iter().filter(|op| predicate(op)).count()
    }
}

impl<T: Clone> ValueLoader for MockLoader<T> {
    type Value = T;
    type Pending = ReloadHandle<T>;

    fn load(&mut self) -> Result<T> {
        let mut state = self.state.lock();
        state.operations.push(LoaderOp::Load);
        state
            .load_value
            .clone()
            .ok_or_else(|| Error::from_message("mock load failed"))
    }

    fn reload(&mut self, stale: &T) -> Result<ReloadHandle<T>> {
        let mut state = self.state.lock();
        state.operations.push(LoaderOp::Reload(stale.clone()));
        if state.fail_reload_start {
            return Err(Error::from_message("mock reload could not start"));
        }
        Ok(Self::issue_handle(&mut state))
    }

    fn on_reload_failure(&mut self, cause: Error, age: Duration, fail_count: u32) -> Result<FailedReloadAction<ReloadHandle<T>>> {
        let mut state = self.state.lock();
        state.operations.push(LoaderOp::ReloadFailure {
            cause: cause.to_string(),
            age,
            fail_count,
        });
        let action = (state.on_failure)(fail_count);
        Self::decide(&mut state, action)
    }

    fn on_reload_timeout(&mut self, age: Duration, fail_count: u32) -> Result<FailedReloadAction<ReloadHandle<T>>> {
        let mut state = self.state.lock();
        state.operations.push(LoaderOp::ReloadTimeout { age, fail_count });
        let action = (state.on_timeout)(fail_count);
        Self::decide(&mut state, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PendingResult, ReloadPoll};

    #[test]
    fn records_load_and_reload() {
        let mut loader = MockLoader::new("v1".to_string());

        assert_eq!(loader.load().unwrap(), "v1");
        let _handle = loader.reload(&"v1".to_string()).unwrap();

        assert_eq!(loader.operations(), vec![LoaderOp::Load, LoaderOp::Reload("v1".to_string())]);
        assert_eq!(loader.load_count(), 1);
        assert_eq!(loader.reload_count(), 1);
        assert_eq!(loader.reload_attempts(), 1);
    }

    #[test]
    fn failing_loads() {
        let mut loader = MockLoader::new(1);
        loader.fail_loads();
        assert!(loader.load().is_err());

        loader.set_load_value(2);
        assert_eq!(loader.load().unwrap(), 2);
    }

    #[test]
    fn handles_are_resolved_by_index() {
        let mut loader = MockLoader::new(0);
        let mut first = loader.reload(&0).unwrap();
        let mut second = loader.reload(&0).unwrap();

        assert!(loader.succeed_reload(1, 20));
        assert!(!loader.succeed_reload(1, 21), "an attempt resolves only once");
        assert!(loader.fail_reload(0, "boom"));

        assert!(matches!(second.poll_result(), ReloadPoll::Ready(20)));
        assert!(matches!(first.poll_result(), ReloadPoll::Failed(_)));
    }

    #[test]
    fn retry_policy_issues_new_attempt() {
        let mut loader = MockLoader::new(0);
        loader.on_failure(|_| MockAction::Retry);

        let action = loader.on_reload_failure(Error::from_message("x"), Duration::ZERO, 1).unwrap();
        assert!(matches!(action, FailedReloadAction::Retry(_)));
        assert_eq!(loader.reload_attempts(), 1);
        assert_eq!(loader.reload_count(), 0, "retry handles are not reload() calls");
    }

    #[test]
    fn failing_policy_returns_error() {
        let mut loader = MockLoader::new(0);
        loader.on_timeout(|_| MockAction::Fail);

        assert!(loader.on_reload_timeout(Duration::ZERO, 1).is_err());
        assert_eq!(loader.reported_fail_counts(), vec![1]);
    }

    #[test]
    fn latest_helpers_without_attempts() {
        let loader = MockLoader::new(0);
        assert!(!loader.succeed_latest(1));
        assert!(!loader.fail_latest("nothing to fail"));
        assert!(!loader.abandon_reload(0));
    }
}
