// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Handles for reloads that complete asynchronously.
//!
//! A cache cell never awaits a reload. It keeps the handle returned by
//! [`ValueLoader::reload`](crate::ValueLoader::reload) and inspects it with
//! [`PendingResult::poll_result`] the next time the cell is accessed.

use futures::channel::oneshot;
use ohno::EnrichableExt;

use crate::{Error, Result};

/// The observed state of a pending reload.
#[derive(Debug)]
pub enum ReloadPoll<T> {
    /// The reload has not finished yet.
    Pending,
    /// The reload produced a new value.
    Ready(T),
    /// The reload finished with an error.
    Failed(Error),
}

impl<T> ReloadPoll<T> {
    /// Returns `true` if the reload has not finished yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(error) => Self::Failed(error),
        }
    }
}

/// A value that becomes available later.
///
/// Implementations must not block: `poll_result` only inspects whether the
/// underlying operation has finished. Once it returns [`ReloadPoll::Ready`] or
/// [`ReloadPoll::Failed`], the cell drops the handle and never polls it again.
pub trait PendingResult {
    /// The value produced by a successful reload.
    type Output;

    /// Inspects the reload without blocking.
    fn poll_result(&mut self) -> ReloadPoll<Self::Output>;
}

/// Creates a one-shot reload channel.
///
/// The [`ReloadHandle`] goes to the cache cell, the [`ReloadCompleter`] to
/// whatever performs the reload (a spawned task, a callback, a thread).
///
/// # Examples
///
/// ```
/// use refresh_cell::{PendingResult, ReloadPoll, reload_channel};
///
/// let (completer, mut handle) = reload_channel::<u32>();
/// assert!(handle.poll_result().is_pending());
///
/// completer.succeed(7);
/// assert!(matches!(handle.poll_result(), ReloadPoll::Ready(7)));
/// ```
#[must_use]
pub fn reload_channel<T>() -> (ReloadCompleter<T>, ReloadHandle<T>) {
    let (tx, rx) = oneshot::channel();
    (ReloadCompleter { tx }, ReloadHandle { state: HandleState::Waiting(rx) })
}

/// The sending half of a [`reload_channel`].
///
/// Dropping the completer without calling any of its methods resolves the
/// paired handle as failed.
#[derive(Debug)]
pub struct ReloadCompleter<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> ReloadCompleter<T> {
    /// Resolves the reload with the given outcome.
    ///
    /// If the handle was already dropped (for example because the cell
    /// abandoned it on retry), the outcome is discarded.
    pub fn complete(self, result: Result<T>) {
        // The cell may have abandoned this attempt; nobody is left to observe it.
        let _ = self.tx.send(result);
    }

    /// Resolves the reload with a new value.
    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    /// Resolves the reload with an error.
    pub fn fail(self, error: Error) {
        self.complete(Err(error));
    }

    /// Returns `true` if the paired handle has been dropped.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_canceled()
    }
}

/// The receiving half of a [`reload_channel`].
#[derive(Debug)]
pub struct ReloadHandle<T> {
    state: HandleState<T>,
}

#[derive(Debug)]
enum HandleState<T> {
    Waiting(oneshot::Receiver<Result<T>>),
    Resolved(Option<Result<T>>),
}

impl<T> ReloadHandle<T> {
    /// Creates a handle that is already resolved with `value`.
    ///
    /// Useful for loaders that can tell synchronously that nothing changed.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            state: HandleState::Resolved(Some(Ok(value))),
        }
    }

    /// Creates a handle that is already resolved with `error`.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self {
            state: HandleState::Resolved(Some(Err(error))),
        }
    }
}

impl<T> PendingResult for ReloadHandle<T> {
    type Output = T;

    fn poll_result(&mut self) -> ReloadPoll<T> {
        match &mut self.state {
            HandleState::Waiting(rx) => match rx.try_recv() {
                Ok(Some(result)) => ReloadPoll::from_result(result),
                Ok(None) => ReloadPoll::Pending,
                Err(canceled) => ReloadPoll::Failed(Error::caused_by(canceled).enrich("reload abandoned before completion")),
            },
            HandleState::Resolved(result) => match result.take() {
                Some(result) => ReloadPoll::from_result(result),
                None => ReloadPoll::Failed(Error::from_message("reload result was already taken")),
            },
        }
    }
}

#[cfg(feature = "tokio")]
impl<T> PendingResult for tokio::task::JoinHandle<Result<T>> {
    type Output = T;

    fn poll_result(&mut self) -> ReloadPoll<T> {
        match futures::FutureExt::now_or_never(&mut *self) {
            Some(Ok(result)) => ReloadPoll::from_result(result),
            Some(Err(join_error)) => ReloadPoll::Failed(Error::caused_by(join_error)),
            None => ReloadPoll::Pending,
        }
    }
}
