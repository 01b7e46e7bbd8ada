// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A single-slot cache that serves stale values while it refreshes them.
//!
//! A [`CacheCell`] holds one value produced by a [`ValueLoader`]:
//! - The first read loads the value synchronously.
//! - Reads of a fresh value return it without touching the loader.
//! - The first read of an expired value starts one asynchronous reload and
//!   returns the stale value; later reads keep doing so until the reload resolves.
//! - Failed and timed out reloads are resolved by the loader, which chooses to
//!   keep, drop or retry through [`FailedReloadAction`].
//!
//! The cell has no background timers. Expiry and reload timeouts are noticed when
//! the cell is accessed, measured with a [`tick::Clock`], which makes the cell fully
//! deterministic under a controlled clock in tests.
//!
//! Reloads report back through a [`PendingResult`]. The crate ships
//! [`ReloadHandle`], created with [`reload_channel`], and with the `tokio` feature
//! `tokio::task::JoinHandle` can be used directly.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use refresh_cell::{CacheCell, Error, FailedReloadAction, ReloadHandle, Result, ValueLoader, reload_channel};
//! use tick::Clock;
//!
//! struct Counter {
//!     next: u64,
//! }
//!
//! impl ValueLoader for Counter {
//!     type Value = u64;
//!     type Pending = ReloadHandle<u64>;
//!
//!     fn load(&mut self) -> Result<u64> {
//!         self.next += 1;
//!         Ok(self.next)
//!     }
//!
//!     fn reload(&mut self, _stale: &u64) -> Result<Self::Pending> {
//!         let (completer, handle) = reload_channel();
//!         self.next += 1;
//!         completer.succeed(self.next);
//!         Ok(handle)
//!     }
//!
//!     fn on_reload_failure(&mut self, _: Error, _: Duration, fail_count: u32) -> Result<FailedReloadAction<Self::Pending>> {
//!         if fail_count < 3 {
//!             Ok(FailedReloadAction::Retry(self.reload(&0)?))
//!         } else {
//!             Ok(FailedReloadAction::Remove)
//!         }
//!     }
//!
//!     fn on_reload_timeout(&mut self, _: Duration, _: u32) -> Result<FailedReloadAction<Self::Pending>> {
//!         Ok(FailedReloadAction::Ignore)
//!     }
//! }
//!
//! let clock = Clock::new_frozen();
//! let mut cell = CacheCell::new(clock, Duration::from_secs(60), Counter { next: 0 });
//!
//! assert_eq!(cell.get()?, 1);
//! assert_eq!(cell.get()?, 1);
//!
//! // Force a reload; the next read adopts its result.
//! assert!(cell.refresh()?);
//! assert_eq!(cell.get()?, 2);
//! # Ok::<(), refresh_cell::Error>(())
//! ```
//!
//! # Features
//!
//! - `logs`: emit a `tracing` event for every state transition.
//! - `metrics`: count state transitions with an OpenTelemetry counter.
//! - `tokio`: use `tokio::task::JoinHandle` as a pending reload.
//! - `test-util`: [`testing::MockLoader`] and controllable clocks for tests.

mod action;
mod builder;
mod cell;
mod error;
mod loader;
mod pending;
mod shared;
mod telemetry;

#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use action::FailedReloadAction;
#[doc(inline)]
pub use builder::CacheCellBuilder;
#[doc(inline)]
pub use cell::{CacheCell, CellState};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use loader::ValueLoader;
#[doc(inline)]
pub use pending::{PendingResult, ReloadCompleter, ReloadHandle, ReloadPoll, reload_channel};
#[doc(inline)]
pub use shared::SharedCacheCell;
#[doc(inline)]
pub use telemetry::CellTelemetry;
