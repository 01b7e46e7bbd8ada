// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Extension traits for telemetry recording.

use std::time::Duration;

use crate::telemetry::{CellActivity, CellOperation, CellTelemetry};

pub(crate) trait CellTelemetryExt {
    /// Records a cell activity if telemetry is enabled.
    fn record(&self, name: &'static str, operation: CellOperation, activity: CellActivity, age: Option<Duration>);
}

impl CellTelemetryExt for Option<CellTelemetry> {
    #[allow(unused_variables, reason = "No-op when telemetry is disabled")]
    fn record(&self, name: &'static str, operation: CellOperation, activity: CellActivity, age: Option<Duration>) {
        #[cfg(any(feature = "logs", feature = "metrics", test))]
        if let Some(t) = self {
            t.record(name, operation, activity, age);
        }
    }
}
