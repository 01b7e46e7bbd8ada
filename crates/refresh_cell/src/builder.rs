// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring cache cells.

use std::time::Duration;

use tick::Clock;

use crate::{CacheCell, SharedCacheCell, ValueLoader, cell::DEFAULT_NAME, telemetry::CellTelemetry};

/// Builder for [`CacheCell`] and [`SharedCacheCell`].
///
/// The loader is supplied last, in [`build`](Self::build), so one builder
/// configuration reads the same regardless of what the cell caches.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use refresh_cell::CacheCellBuilder;
/// # use refresh_cell::{Error, FailedReloadAction, ReloadHandle, Result, ValueLoader};
/// # struct Token;
/// # impl ValueLoader for Token {
/// #     type Value = String;
/// #     type Pending = ReloadHandle<String>;
/// #     fn load(&mut self) -> Result<String> { Ok("token".to_string()) }
/// #     fn reload(&mut self, _: &String) -> Result<Self::Pending> { Ok(ReloadHandle::ready("token".to_string())) }
/// #     fn on_reload_failure(&mut self, _: Error, _: Duration, _: u32) -> Result<FailedReloadAction<Self::Pending>> { Ok(FailedReloadAction::Ignore) }
/// #     fn on_reload_timeout(&mut self, _: Duration, _: u32) -> Result<FailedReloadAction<Self::Pending>> { Ok(FailedReloadAction::Ignore) }
/// # }
/// # fn example(clock: tick::Clock) {
/// let cell = CacheCellBuilder::new(clock, Duration::from_secs(300))
///     .name("auth_token")
///     .reload_timeout(Duration::from_secs(10))
///     .build(Token);
///
/// assert_eq!(cell.name(), "auth_token");
/// assert_eq!(cell.reload_timeout(), Duration::from_secs(10));
/// # }
/// ```
#[derive(Debug)]
pub struct CacheCellBuilder {
    name: &'static str,
    clock: Clock,
    max_age: Duration,
    reload_timeout: Option<Duration>,
    telemetry: Option<CellTelemetry>,
}

impl CacheCellBuilder {
    /// Creates a builder for cells whose values expire after `max_age`.
    #[must_use]
    pub fn new(clock: Clock, max_age: Duration) -> Self {
        Self {
            name: DEFAULT_NAME,
            clock,
            max_age,
            reload_timeout: None,
            telemetry: None,
        }
    }

    /// Sets the name reported in telemetry.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Sets how long a reload may stay unresolved before the timeout policy runs.
    ///
    /// Defaults to the maximum age.
    #[must_use]
    pub fn reload_timeout(mut self, timeout: Duration) -> Self {
        self.reload_timeout = Some(timeout);
        self
    }

    /// Attaches a telemetry sink.
    #[must_use]
    pub fn telemetry(mut self, telemetry: CellTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds an empty cell around `loader`.
    #[must_use]
    pub fn build<L: ValueLoader>(self, loader: L) -> CacheCell<L> {
        let reload_timeout = self.reload_timeout.unwrap_or(self.max_age);
        CacheCell::from_parts(self.name, self.clock, self.max_age, reload_timeout, self.telemetry, loader)
    }

    /// Builds an empty cell around `loader` that can be shared between threads.
    #[must_use]
    pub fn build_shared<L: ValueLoader>(self, loader: L) -> SharedCacheCell<L> {
        SharedCacheCell::new(self.build(loader))
    }
}
