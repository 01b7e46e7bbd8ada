// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The strategy a cache cell uses to produce and refresh its value.

use std::time::Duration;

use crate::{Error, FailedReloadAction, PendingResult, Result};

/// Produces, refreshes and arbitrates the value held by a [`CacheCell`](crate::CacheCell).
///
/// The cell calls [`load`](Self::load) when it is empty and
/// [`reload`](Self::reload) once its value has expired or a refresh is
/// requested. When a reload fails or
/// does not finish within the cell's reload timeout, the cell asks the loader
/// what to do through [`on_reload_failure`](Self::on_reload_failure) or
/// [`on_reload_timeout`](Self::on_reload_timeout).
///
/// Errors returned from any of these methods are not handled by the cell; they
/// propagate to whoever called [`CacheCell::get`](crate::CacheCell::get) or
/// [`CacheCell::refresh`](crate::CacheCell::refresh).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use refresh_cell::{
///     Error, FailedReloadAction, ReloadHandle, Result, ValueLoader, reload_channel,
/// };
///
/// struct Config {
///     version: u64,
/// }
///
/// impl ValueLoader for Config {
///     type Value = u64;
///     type Pending = ReloadHandle<u64>;
///
///     fn load(&mut self) -> Result<u64> {
///         Ok(self.version)
///     }
///
///     fn reload(&mut self, stale: &u64) -> Result<Self::Pending> {
///         let (completer, handle) = reload_channel();
///         // Hand `completer` to a background task; here we finish right away.
///         completer.succeed(stale + 1);
///         Ok(handle)
///     }
///
///     fn on_reload_failure(&mut self, _cause: Error, _age: Duration, _fail_count: u32) -> Result<FailedReloadAction<Self::Pending>> {
///         Ok(FailedReloadAction::Ignore)
///     }
///
///     fn on_reload_timeout(&mut self, _age: Duration, _fail_count: u32) -> Result<FailedReloadAction<Self::Pending>> {
///         Ok(FailedReloadAction::Remove)
///     }
/// }
/// ```
pub trait ValueLoader {
    /// The cached value.
    type Value;

    /// The handle returned for an asynchronous reload.
    type Pending: PendingResult<Output = Self::Value>;

    /// Loads the value synchronously. Called only while the cell is empty.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller of `get()`; the cell stays empty.
    fn load(&mut self) -> Result<Self::Value>;

    /// Starts an asynchronous reload of an expired value and returns immediately.
    ///
    /// `stale` is the value currently cached, which lets the loader skip work
    /// when nothing changed.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller; no reload is recorded as started.
    fn reload(&mut self, stale: &Self::Value) -> Result<Self::Pending>;

    /// Decides how to proceed after a reload finished with `cause`.
    ///
    /// `age` is the age of the cached value and `fail_count` the number of
    /// consecutive failed or timed out reloads, this one included.
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller of `get()`.
    fn on_reload_failure(&mut self, cause: Error, age: Duration, fail_count: u32) -> Result<FailedReloadAction<Self::Pending>>;

    /// Decides how to proceed after a reload did not finish in time.
    ///
    /// `fail_count` continues the same sequence as for
    /// [`on_reload_failure`](Self::on_reload_failure).
    ///
    /// # Errors
    ///
    /// Any error is returned to the caller of `get()`.
    fn on_reload_timeout(&mut self, age: Duration, fail_count: u32) -> Result<FailedReloadAction<Self::Pending>>;
}
