// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A cache cell shared between threads.

use std::{fmt::Debug, sync::Arc, time::Duration};

use parking_lot::Mutex;

use crate::{CacheCell, CellState, Result, ValueLoader};

/// A [`CacheCell`] that can be cloned and used from many threads.
///
/// Every operation locks the cell for its whole duration, including the calls it
/// makes into the loader. Concurrent readers of an expired value therefore start
/// exactly one reload between them, and loader methods must not block for long.
///
/// Reads return owned clones of the cached value.
pub struct SharedCacheCell<L: ValueLoader> {
    inner: Arc<Mutex<CacheCell<L>>>,
}

impl<L: ValueLoader> SharedCacheCell<L> {
    /// Wraps `cell` for shared use.
    #[must_use]
    pub fn new(cell: CacheCell<L>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cell)),
        }
    }

    /// Removes and returns the value. See [`CacheCell::remove`].
    pub fn remove(&self) -> Option<L::Value> {
        self.inner.lock().remove()
    }

    /// Starts a reload ahead of expiry. See [`CacheCell::refresh`].
    ///
    /// # Errors
    ///
    /// Returns the error raised by [`ValueLoader::reload`].
    pub fn refresh(&self) -> Result<bool> {
        self.inner.lock().refresh()
    }

    /// See [`CacheCell::has_value`].
    #[must_use]
    pub fn has_value(&self) -> bool {
        self.inner.lock().has_value()
    }

    /// See [`CacheCell::is_expired`].
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.inner.lock().is_expired()
    }

    /// See [`CacheCell::age`].
    #[must_use]
    pub fn age(&self) -> Duration {
        self.inner.lock().age()
    }

    /// See [`CacheCell::is_reloading`].
    #[must_use]
    pub fn is_reloading(&self) -> bool {
        self.inner.lock().is_reloading()
    }

    /// See [`CacheCell::fail_count`].
    #[must_use]
    pub fn fail_count(&self) -> u32 {
        self.inner.lock().fail_count()
    }

    /// See [`CacheCell::state`].
    #[must_use]
    pub fn state(&self) -> CellState {
        self.inner.lock().state()
    }

    /// See [`CacheCell::reload_timeout`].
    #[must_use]
    pub fn reload_timeout(&self) -> Duration {
        self.inner.lock().reload_timeout()
    }

    /// See [`CacheCell::set_reload_timeout`].
    pub fn set_reload_timeout(&self, timeout: Duration) {
        self.inner.lock().set_reload_timeout(timeout);
    }

    /// Runs `f` with exclusive access to the underlying cell.
    pub fn with<R>(&self, f: impl FnOnce(&mut CacheCell<L>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<L> SharedCacheCell<L>
where
    L: ValueLoader,
    L::Value: Clone,
{
    /// Returns the cached value, loading or refreshing it as needed. See [`CacheCell::get`].
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`CacheCell::get`].
    pub fn get(&self) -> Result<L::Value> {
        self.inner.lock().get()
    }

    /// Stores `value` as a fresh value and returns a copy of it. See [`CacheCell::set`].
    pub fn set(&self, value: L::Value) -> L::Value {
        self.inner.lock().set(value).clone()
    }

    /// Returns a copy of the cached value without touching the loader.
    #[must_use]
    pub fn peek(&self) -> Option<L::Value> {
        self.inner.lock().peek().cloned()
    }
}

impl<L: ValueLoader> Clone for SharedCacheCell<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: ValueLoader> Debug for SharedCacheCell<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(cell) => f.debug_tuple("SharedCacheCell").field(&*cell).finish(),
            None => f.debug_tuple("SharedCacheCell").field(&format_args!("<locked>")).finish(),
        }
    }
}

impl<L: ValueLoader> From<CacheCell<L>> for SharedCacheCell<L> {
    fn from(cell: CacheCell<L>) -> Self {
        Self::new(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    use tick::ClockControl;

    use crate::testing::MockLoader;

    const MAX_AGE: Duration = Duration::from_millis(100);

    #[test]
    fn clones_share_one_cell() {
        let control = ClockControl::new();
        let loader = MockLoader::new(1);
        let cell = SharedCacheCell::new(CacheCell::new(control.to_clock(), MAX_AGE, loader.clone()));
        let other = cell.clone();

        assert_eq!(cell.get().unwrap(), 1);
        assert_eq!(other.peek(), Some(1));

        assert_eq!(other.set(5), 5);
        assert_eq!(cell.get().unwrap(), 5);
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn concurrent_first_reads_load_once() {
        let control = ClockControl::new();
        let loader = MockLoader::new(1);
        let cell = SharedCacheCell::new(CacheCell::new(control.to_clock(), MAX_AGE, loader.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || cell.get().unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(loader.load_count(), 1);
    }

    #[test]
    fn concurrent_stale_reads_start_a_single_reload() {
        let control = ClockControl::new();
        let loader = MockLoader::new(1);
        let cell = SharedCacheCell::new(CacheCell::new(control.to_clock(), MAX_AGE, loader.clone()));
        cell.get().unwrap();
        control.advance_millis(101);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || cell.get().unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(loader.reload_count(), 1);
        assert!(cell.is_reloading());

        loader.succeed_latest(2);
        assert_eq!(cell.get().unwrap(), 2);
        assert_eq!(cell.fail_count(), 0);
    }

    #[test]
    fn with_exposes_the_loader() {
        let control = ClockControl::new();
        let cell = SharedCacheCell::from(CacheCell::new(control.to_clock(), MAX_AGE, MockLoader::new(1)));
        cell.get().unwrap();

        let loads = cell.with(|inner| inner.loader().load_count());
        assert_eq!(loads, 1);
    }

    #[test]
    fn remove_and_refresh_pass_through() {
        let control = ClockControl::new();
        let loader = MockLoader::new(1);
        let cell = SharedCacheCell::new(CacheCell::new(control.to_clock(), MAX_AGE, loader.clone()));

        assert!(!cell.refresh().unwrap());
        cell.get().unwrap();
        assert!(cell.refresh().unwrap());
        assert_eq!(cell.state(), CellState::Reloading);

        assert_eq!(cell.remove(), Some(1));
        assert!(!cell.has_value());
        assert!(!cell.is_expired());
        assert_eq!(cell.age(), Duration::ZERO);
    }

    #[test]
    fn debug_does_not_block_while_locked() {
        let control = ClockControl::new();
        let cell = SharedCacheCell::new(CacheCell::new(control.to_clock(), MAX_AGE, MockLoader::new(1)));

        assert!(format!("{cell:?}").contains("CacheCell"));

        let inside = cell.with(|_| format!("{cell:?}"));
        assert!(inside.contains("<locked>"), "got: {inside}");
    }

    #[test]
    fn shared_cell_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedCacheCell<MockLoader<u32>>>();
    }
}
