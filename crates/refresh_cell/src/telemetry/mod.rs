// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache cell telemetry integration with OpenTelemetry and `tracing`.
//!
//! With the `logs` feature every state transition of a cell emits a structured
//! `tracing` event; with the `metrics` feature it increments an OpenTelemetry
//! counter. Without either feature recording compiles to nothing.

#[cfg(any(feature = "logs", feature = "metrics", test))]
use std::sync::Arc;

#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;
#[cfg(any(feature = "logs", feature = "metrics", test))]
use recorder::CellTelemetryInner;

pub(crate) mod attributes;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(any(feature = "logs", feature = "metrics", test))]
pub(crate) mod recorder;
#[cfg(test)]
pub(crate) mod testing;

/// Telemetry sink for cache cell activity.
///
/// Construct this and pass it to the cell builder via
/// [`CacheCellBuilder::telemetry`](crate::CacheCellBuilder::telemetry).
#[derive(Clone, Debug)]
pub struct CellTelemetry {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    inner: Arc<CellTelemetryInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellOperation {
    Get,
    Set,
    Remove,
    Refresh,
}

impl CellOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cell.get",
            Self::Set => "cell.set",
            Self::Remove => "cell.remove",
            Self::Refresh => "cell.refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellActivity {
    Hit,
    Loaded,
    Stale,
    ReloadStarted,
    Reloaded,
    ReloadFailed,
    ReloadTimedOut,
    Ignored,
    Removed,
    Retried,
    Inserted,
    Invalidated,
    Error,
}

impl CellActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cell.hit",
            Self::Loaded => "cell.loaded",
            Self::Stale => "cell.stale",
            Self::ReloadStarted => "cell.reload_started",
            Self::Reloaded => "cell.reloaded",
            Self::ReloadFailed => "cell.reload_failed",
            Self::ReloadTimedOut => "cell.reload_timed_out",
            Self::Ignored => "cell.ignored",
            Self::Removed => "cell.removed",
            Self::Retried => "cell.retried",
            Self::Inserted => "cell.inserted",
            Self::Invalidated => "cell.invalidated",
            Self::Error => "cell.error",
        }
    }

    #[cfg(any(feature = "logs", test))]
    pub fn severity(self) -> Severity {
        match self {
            Self::Hit | Self::Stale => Severity::Debug,
            Self::Loaded | Self::ReloadStarted | Self::Reloaded | Self::Ignored | Self::Removed | Self::Retried | Self::Inserted | Self::Invalidated => {
                Severity::Info
            }
            Self::ReloadFailed | Self::ReloadTimedOut => Severity::Warn,
            Self::Error => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_operation_as_str() {
        assert_eq!(CellOperation::Get.as_str(), "cell.get");
        assert_eq!(CellOperation::Set.as_str(), "cell.set");
        assert_eq!(CellOperation::Remove.as_str(), "cell.remove");
        assert_eq!(CellOperation::Refresh.as_str(), "cell.refresh");
    }

    #[test]
    fn cell_activity_as_str() {
        assert_eq!(CellActivity::Hit.as_str(), "cell.hit");
        assert_eq!(CellActivity::Loaded.as_str(), "cell.loaded");
        assert_eq!(CellActivity::Stale.as_str(), "cell.stale");
        assert_eq!(CellActivity::ReloadStarted.as_str(), "cell.reload_started");
        assert_eq!(CellActivity::Reloaded.as_str(), "cell.reloaded");
        assert_eq!(CellActivity::ReloadFailed.as_str(), "cell.reload_failed");
        assert_eq!(CellActivity::ReloadTimedOut.as_str(), "cell.reload_timed_out");
        assert_eq!(CellActivity::Ignored.as_str(), "cell.ignored");
        assert_eq!(CellActivity::Removed.as_str(), "cell.removed");
        assert_eq!(CellActivity::Retried.as_str(), "cell.retried");
        assert_eq!(CellActivity::Inserted.as_str(), "cell.inserted");
        assert_eq!(CellActivity::Invalidated.as_str(), "cell.invalidated");
        assert_eq!(CellActivity::Error.as_str(), "cell.error");
    }

    #[test]
    fn cell_activity_severity() {
        assert_eq!(CellActivity::Hit.severity(), Severity::Debug);
        assert_eq!(CellActivity::Stale.severity(), Severity::Debug);
        assert_eq!(CellActivity::Loaded.severity(), Severity::Info);
        assert_eq!(CellActivity::Retried.severity(), Severity::Info);
        assert_eq!(CellActivity::ReloadFailed.severity(), Severity::Warn);
        assert_eq!(CellActivity::ReloadTimedOut.severity(), Severity::Warn);
        assert_eq!(CellActivity::Error.severity(), Severity::Error);
    }
}
