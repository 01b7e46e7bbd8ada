// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The self-refreshing cache cell.

use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use ohno::EnrichableExt;
use tick::Clock;

use crate::{
    Error, FailedReloadAction, PendingResult, ReloadPoll, Result, ValueLoader,
    builder::CacheCellBuilder,
    telemetry::{CellActivity, CellOperation, CellTelemetry, ext::CellTelemetryExt},
};

pub(crate) const DEFAULT_NAME: &str = "refresh_cell";

/// The externally observable state of a [`CacheCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// The cell holds no value; the next read loads one.
    Empty,
    /// The cell holds a value younger than the maximum age.
    Fresh,
    /// The value has expired and no reload has been started yet.
    ///
    /// Expiry is only observed lazily, so the next read starts the reload.
    Stale,
    /// A reload is in flight; reads keep returning the current value.
    Reloading,
}

#[derive(Debug)]
struct Entry<T> {
    value: T,
    updated_at: Instant,
}

impl<T> Entry<T> {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.updated_at)
    }
}

#[derive(Debug)]
struct InFlight<P> {
    attempt: Attempt<P>,
    started_at: Instant,
}

#[derive(Debug)]
enum Attempt<P> {
    Waiting(P),
    /// Resolved with an error the failure policy has not accepted yet.
    Failed(Error),
}

impl<P: PendingResult> Attempt<P> {
    fn poll(&mut self) -> ReloadPoll<P::Output> {
        match self {
            Self::Waiting(handle) => handle.poll_result(),
            Self::Failed(cause) => ReloadPoll::Failed(cause.clone()),
        }
    }
}

/// A single-slot cache that serves stale values while it refreshes them.
///
/// The cell loads its value on first access. While the value is younger than
/// the maximum age, reads return it without touching the loader. Once it is
/// older, the next read starts one asynchronous reload and keeps returning the
/// stale value until that reload resolves. Failed and stuck reloads are
/// resolved by the loader's policy hooks, see [`FailedReloadAction`].
///
/// The cell never spawns work or arms timers. Expiry and reload timeouts are
/// detected when the cell is accessed, using the injected [`Clock`]. At most
/// one reload is in flight at any time.
///
/// `CacheCell` methods take `&mut self`; share a cell between threads through
/// [`SharedCacheCell`](crate::SharedCacheCell).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use refresh_cell::{CacheCell, Error, FailedReloadAction, ReloadHandle, Result, ValueLoader};
/// use tick::Clock;
///
/// struct Answer;
///
/// impl ValueLoader for Answer {
///     type Value = u32;
///     type Pending = ReloadHandle<u32>;
///
///     fn load(&mut self) -> Result<u32> {
///         Ok(42)
///     }
///
///     fn reload(&mut self, stale: &u32) -> Result<Self::Pending> {
///         Ok(ReloadHandle::ready(*stale))
///     }
///
///     fn on_reload_failure(&mut self, _: Error, _: Duration, _: u32) -> Result<FailedReloadAction<Self::Pending>> {
///         Ok(FailedReloadAction::Ignore)
///     }
///
///     fn on_reload_timeout(&mut self, _: Duration, _: u32) -> Result<FailedReloadAction<Self::Pending>> {
///         Ok(FailedReloadAction::Ignore)
///     }
/// }
///
/// # fn example(clock: Clock) -> Result<()> {
/// let mut cell = CacheCell::new(clock, Duration::from_secs(60), Answer);
/// assert_eq!(cell.get()?, 42);
/// assert!(cell.has_value());
/// # Ok(())
/// # }
/// ```
pub struct CacheCell<L: ValueLoader> {
    name: &'static str,
    clock: Clock,
    max_age: Duration,
    reload_timeout: Duration,
    loader: L,
    entry: Option<Entry<L::Value>>,
    in_flight: Option<InFlight<L::Pending>>,
    fail_count: u32,
    telemetry: Option<CellTelemetry>,
}

impl<L: ValueLoader> Debug for CacheCell<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheCell")
            .field("name", &self.name)
            .field("max_age", &self.max_age)
            .field("reload_timeout", &self.reload_timeout)
            .field("state", &self.state())
            .field("fail_count", &self.fail_count)
            .finish_non_exhaustive()
    }
}

/// Construction and configuration.
impl<L: ValueLoader> CacheCell<L> {
    /// Creates an empty cell whose values expire after `max_age`.
    ///
    /// The reload timeout defaults to `max_age`. Use [`CacheCellBuilder`] to
    /// configure it, name the cell or attach telemetry.
    #[must_use]
    pub fn new(clock: Clock, max_age: Duration, loader: L) -> Self {
        CacheCellBuilder::new(clock, max_age).build(loader)
    }

    pub(crate) fn from_parts(
        name: &'static str,
        clock: Clock,
        max_age: Duration,
        reload_timeout: Duration,
        telemetry: Option<CellTelemetry>,
        loader: L,
    ) -> Self {
        Self {
            name,
            clock,
            max_age,
            reload_timeout,
            loader,
            entry: None,
            in_flight: None,
            fail_count: 0,
            telemetry,
        }
    }

    /// Returns the name of this cell for telemetry identification.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the clock the cell measures ages with.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the age after which the value is considered expired.
    #[must_use]
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Returns how long a reload may stay unresolved before it counts as timed out.
    #[must_use]
    pub fn reload_timeout(&self) -> Duration {
        self.reload_timeout
    }

    /// Changes the reload timeout.
    ///
    /// Applies to the reload currently in flight as well, measured from when it started.
    pub fn set_reload_timeout(&mut self, timeout: Duration) {
        self.reload_timeout = timeout;
    }

    /// Returns the loader.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the loader mutably.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

/// Queries. None of these call into the loader or poll a pending reload.
impl<L: ValueLoader> CacheCell<L> {
    /// Returns `true` if the cell holds a value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.entry.is_some()
    }

    /// Returns `true` if the cell holds a value older than the maximum age.
    ///
    /// An empty cell is never expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = self.clock.instant();
        self.entry.as_ref().is_some_and(|entry| entry.age(now) > self.max_age)
    }

    /// Returns the time since the value was last stored or confirmed.
    ///
    /// Returns [`Duration::ZERO`] for an empty cell.
    #[must_use]
    pub fn age(&self) -> Duration {
        let now = self.clock.instant();
        self.entry.as_ref().map_or(Duration::ZERO, |entry| entry.age(now))
    }

    /// Returns `true` if a reload is in flight.
    #[must_use]
    pub fn is_reloading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns the number of consecutive failed or timed out reloads.
    #[must_use]
    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    /// Returns the current state of the cell.
    #[must_use]
    pub fn state(&self) -> CellState {
        if !self.has_value() {
            CellState::Empty
        } else if self.is_reloading() {
            CellState::Reloading
        } else if self.is_expired() {
            CellState::Stale
        } else {
            CellState::Fresh
        }
    }

    /// Returns the cached value without loading, reloading or polling anything.
    #[must_use]
    pub fn peek(&self) -> Option<&L::Value> {
        self.entry.as_ref().map(|entry| &entry.value)
    }
}

/// Mutations.
impl<L: ValueLoader> CacheCell<L> {
    /// Stores `value` as a fresh value.
    ///
    /// Any reload in flight is abandoned and the failure counter resets.
    pub fn set(&mut self, value: L::Value) -> &L::Value {
        self.in_flight = None;
        self.fail_count = 0;
        self.record(CellOperation::Set, CellActivity::Inserted, None);

        let entry = self.entry.insert(Entry {
            value,
            updated_at: self.clock.instant(),
        });
        &entry.value
    }

    /// Removes and returns the value, abandoning any reload in flight.
    pub fn remove(&mut self) -> Option<L::Value> {
        self.in_flight = None;
        self.fail_count = 0;

        let entry = self.entry.take()?;
        self.record(CellOperation::Remove, CellActivity::Invalidated, Some(entry.age(self.clock.instant())));
        Some(entry.value)
    }

    /// Starts a reload even though the value may not have expired yet.
    ///
    /// Returns `false` without doing anything when the cell is empty or a reload
    /// is already in flight. The cell moves to [`CellState::Reloading`]; the next
    /// [`get`](Self::get) observes the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`ValueLoader::reload`]; the cell is left unchanged.
    pub fn refresh(&mut self) -> Result<bool> {
        if self.in_flight.is_some() {
            return Ok(false);
        }
        self.start_reload(CellOperation::Refresh)
    }

    fn start_reload(&mut self, operation: CellOperation) -> Result<bool> {
        let Some(entry) = &self.entry else {
            return Ok(false);
        };

        let now = self.clock.instant();
        let age = entry.age(now);
        let handle = self
            .loader
            .reload(&entry.value)
            .enrich("failed to start reload")
            .inspect_err(|_| self.record(operation, CellActivity::Error, Some(age)))?;

        self.in_flight = Some(InFlight {
            attempt: Attempt::Waiting(handle),
            started_at: now,
        });
        self.record(operation, CellActivity::ReloadStarted, Some(age));
        Ok(true)
    }

    fn record(&self, operation: CellOperation, activity: CellActivity, age: Option<Duration>) {
        self.telemetry.record(self.name, operation, activity, age);
    }
}

/// Reads.
impl<L> CacheCell<L>
where
    L: ValueLoader,
    L::Value: Clone,
{
    /// Returns the cached value, loading or refreshing it as needed.
    ///
    /// - An empty cell calls [`ValueLoader::load`] and stores the result.
    /// - A fresh value is returned as is.
    /// - An expired value is returned as is, after starting a reload if none is in flight.
    /// - When a reload is in flight, its outcome is checked first: a new value is adopted
    ///   and returned; a failure or timeout is resolved through the loader's policy
    ///   hooks. After a [`FailedReloadAction::Remove`] the discarded value is returned
    ///   one last time and the cell is empty.
    ///
    /// # Errors
    ///
    /// Returns errors raised by the loader: a failed initial load (the cell stays
    /// empty), a reload that could not start, or a failing policy hook. A failing hook
    /// leaves the cell as it was: the reload stays in flight, and the same failure or
    /// timeout is handed to the hook again on the next read.
    pub fn get(&mut self) -> Result<L::Value> {
        let now = self.clock.instant();
        let Some(entry) = &self.entry else {
            return self.load();
        };

        let age = entry.age(now);
        if self.in_flight.is_none() && age <= self.max_age {
            self.record(CellOperation::Get, CellActivity::Hit, Some(age));
            return Ok(entry.value.clone());
        }

        let current = entry.value.clone();
        self.revalidate(now, age, current)
    }

    fn load(&mut self) -> Result<L::Value> {
        let value = self
            .loader
            .load()
            .enrich("initial load failed")
            .inspect_err(|_| self.record(CellOperation::Get, CellActivity::Error, None))?;

        self.fail_count = 0;
        self.entry = Some(Entry {
            value: value.clone(),
            updated_at: self.clock.instant(),
        });
        self.record(CellOperation::Get, CellActivity::Loaded, Some(Duration::ZERO));
        Ok(value)
    }

    fn revalidate(&mut self, now: Instant, age: Duration, current: L::Value) -> Result<L::Value> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            self.start_reload(CellOperation::Get)?;
            self.record(CellOperation::Get, CellActivity::Stale, Some(age));
            return Ok(current);
        };

        let started_at = in_flight.started_at;
        match in_flight.attempt.poll() {
            ReloadPoll::Ready(value) => {
                self.in_flight = None;
                self.fail_count = 0;
                self.entry = Some(Entry {
                    value: value.clone(),
                    updated_at: now,
                });
                self.record(CellOperation::Get, CellActivity::Reloaded, Some(age));
                Ok(value)
            }
            ReloadPoll::Failed(cause) => {
                // Kept until a policy decision replaces it, so a failing hook can be retried.
                in_flight.attempt = Attempt::Failed(cause.clone());
                self.record(CellOperation::Get, CellActivity::ReloadFailed, Some(age));

                let fail_count = self.fail_count.saturating_add(1);
                let action = self
                    .loader
                    .on_reload_failure(cause, age, fail_count)
                    .enrich("reload failure policy failed")
                    .inspect_err(|_| self.record(CellOperation::Get, CellActivity::Error, Some(age)))?;

                self.fail_count = fail_count;
                Ok(self.apply(action, age, current))
            }
            ReloadPoll::Pending if now.saturating_duration_since(started_at) > self.reload_timeout => {
                self.record(CellOperation::Get, CellActivity::ReloadTimedOut, Some(age));

                let fail_count = self.fail_count.saturating_add(1);
                let action = self
                    .loader
                    .on_reload_timeout(age, fail_count)
                    .enrich("reload timeout policy failed")
                    .inspect_err(|_| self.record(CellOperation::Get, CellActivity::Error, Some(age)))?;

                self.fail_count = fail_count;
                Ok(self.apply(action, age, current))
            }
            ReloadPoll::Pending => {
                self.record(CellOperation::Get, CellActivity::Stale, Some(age));
                Ok(current)
            }
        }
    }

    /// Resolves a failed or timed out reload and returns the value to hand out.
    fn apply(&mut self, action: FailedReloadAction<L::Pending>, age: Duration, current: L::Value) -> L::Value {
        match action {
            FailedReloadAction::Ignore => {
                self.in_flight = None;
                self.fail_count = 0;
                let now = self.clock.instant();
                if let Some(entry) = self.entry.as_mut() {
                    entry.updated_at = now;
                }
                self.record(CellOperation::Get, CellActivity::Ignored, Some(age));
            }
            FailedReloadAction::Remove => {
                self.in_flight = None;
                self.fail_count = 0;
                self.entry = None;
                self.record(CellOperation::Get, CellActivity::Removed, Some(age));
            }
            FailedReloadAction::Retry(handle) => {
                self.in_flight = Some(InFlight {
                    attempt: Attempt::Waiting(handle),
                    started_at: self.clock.instant(),
                });
                self.record(CellOperation::Get, CellActivity::Retried, Some(age));
            }
        }
        current
    }
}
