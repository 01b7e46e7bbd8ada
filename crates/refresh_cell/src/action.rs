// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Resolutions for reloads that failed or got stuck.

/// How a cache cell resolves a reload that failed or timed out.
///
/// Returned by [`ValueLoader::on_reload_failure`](crate::ValueLoader::on_reload_failure)
/// and [`ValueLoader::on_reload_timeout`](crate::ValueLoader::on_reload_timeout).
/// `P` is the loader's pending handle type.
///
/// # Examples
///
/// ```
/// use refresh_cell::{FailedReloadAction, ReloadHandle};
///
/// // Give up after three consecutive failures, otherwise keep serving the old value.
/// fn decide(fail_count: u32) -> FailedReloadAction<ReloadHandle<String>> {
///     if fail_count >= 3 {
///         FailedReloadAction::Remove
///     } else {
///         FailedReloadAction::Ignore
///     }
/// }
///
/// assert!(matches!(decide(1), FailedReloadAction::Ignore));
/// assert!(matches!(decide(3), FailedReloadAction::Remove));
/// ```
#[derive(Debug)]
pub enum FailedReloadAction<P> {
    /// Treat the stale value as fresh again.
    ///
    /// The value is kept, its age restarts from zero and the failure counter resets.
    Ignore,
    /// Discard the value. The next read loads it from scratch.
    Remove,
    /// Keep serving the stale value and wait for a new reload attempt.
    ///
    /// The previous attempt is abandoned; whatever it produces later is never observed.
    /// The failure counter keeps counting.
    Retry(P),
}
