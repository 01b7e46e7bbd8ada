// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cell telemetry implementation and recording.

use std::{sync::Arc, time::Duration};

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{KeyValue, metrics::Counter};
#[cfg(any(feature = "logs", test))]
use opentelemetry::logs::Severity;
use opentelemetry::metrics::Meter;

use crate::telemetry::{CellActivity, CellOperation, CellTelemetry};
#[cfg(any(feature = "metrics", test))]
use crate::telemetry::{attributes, metrics::create_event_counter};

#[derive(Debug)]
pub(crate) struct CellTelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
}

impl CellTelemetry {
    /// Creates a new telemetry sink.
    ///
    /// # Arguments
    ///
    /// * `logging_enabled` - Whether to emit `tracing` events (requires the `logs` feature)
    /// * `meter` - The meter used to create the event counter (requires the `metrics` feature)
    #[allow(unused_variables, reason = "the meter is ignored without the metrics feature")]
    #[must_use]
    pub fn new(logging_enabled: bool, meter: Option<&Meter>) -> Self {
        Self {
            inner: Arc::new(CellTelemetryInner {
                logging_enabled,
                #[cfg(any(feature = "metrics", test))]
                event_counter: meter.map(create_event_counter),
            }),
        }
    }

    /// Creates a new telemetry sink with a meter obtained from `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn with_meter_provider(logging_enabled: bool, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        let meter = crate::telemetry::metrics::create_meter(provider);
        Self::new(logging_enabled, Some(&meter))
    }

    /// Records one cell activity.
    ///
    /// `age` is the age of the cached value when the activity happened, if the
    /// cell held one.
    #[inline]
    pub(crate) fn record(&self, cell_name: &'static str, operation: CellOperation, activity: CellActivity, age: Option<Duration>) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(counter) = &self.inner.event_counter {
            let attrs = [
                KeyValue::new(attributes::CELL_NAME, cell_name),
                KeyValue::new(attributes::CELL_OPERATION_NAME, operation.as_str()),
                KeyValue::new(attributes::CELL_ACTIVITY_NAME, activity.as_str()),
            ];
            counter.add(1, &attrs);
        }

        if self.inner.logging_enabled {
            Self::emit(cell_name, operation, activity, age);
        }
    }

    #[allow(unused_variables, reason = "logging compiles to nothing without the logs feature")]
    fn emit(cell_name: &'static str, operation: CellOperation, activity: CellActivity, age: Option<Duration>) {
        #[cfg(any(feature = "logs", test))]
        {
            let op = operation.as_str();
            let act = activity.as_str();
            let age_ns = age.map(|d| d.as_nanos());

            // Tracing level must be constant, so a macro selects it.
            // Field names must match the constants in attributes.rs.
            macro_rules! emit_event {
                ($level:ident) => {
                    tracing::$level!(
                        cell.name = cell_name,
                        cell.operation = op,
                        cell.activity = act,
                        cell.age_ns = ?age_ns,
                        "cell.event"
                    )
                };
            }

            match activity.severity() {
                Severity::Error => emit_event!(error),
                Severity::Warn => emit_event!(warn),
                Severity::Info => emit_event!(info),
                Severity::Debug => emit_event!(debug),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use opentelemetry::metrics::MeterProvider;

    use crate::telemetry::testing::{LogCapture, MetricTester};

    #[test]
    fn metrics_record_emits_correct_attributes() {
        let tester = MetricTester::new();
        let meter = tester.meter_provider().meter("cell");
        let telemetry = CellTelemetry::new(false, Some(&meter));

        telemetry.record("config_cell", CellOperation::Get, CellActivity::Reloaded, Some(Duration::from_millis(5)));

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::CELL_NAME, "config_cell"),
            KeyValue::new(attributes::CELL_OPERATION_NAME, CellOperation::Get.as_str()),
            KeyValue::new(attributes::CELL_ACTIVITY_NAME, CellActivity::Reloaded.as_str()),
        ]);
    }

    #[test]
    fn with_meter_provider_counts_events() {
        let tester = MetricTester::new();
        let telemetry = CellTelemetry::with_meter_provider(false, tester.meter_provider());

        telemetry.record("provider_cell", CellOperation::Remove, CellActivity::Invalidated, None);

        tester.assert_attributes_contain(&[KeyValue::new(attributes::CELL_NAME, "provider_cell")]);
    }

    #[test]
    fn logs_emit_contains_all_fields_and_values() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        CellTelemetry::emit(
            "token_cell",
            CellOperation::Refresh,
            CellActivity::ReloadStarted,
            Some(Duration::from_nanos(12345)),
        );

        capture.assert_contains(attributes::CELL_NAME);
        capture.assert_contains(attributes::CELL_OPERATION_NAME);
        capture.assert_contains(attributes::CELL_ACTIVITY_NAME);
        capture.assert_contains(attributes::CELL_AGE_NAME);
        capture.assert_contains(attributes::CELL_EVENT_NAME);

        capture.assert_contains("token_cell");
        capture.assert_contains(CellOperation::Refresh.as_str());
        capture.assert_contains(CellActivity::ReloadStarted.as_str());
        capture.assert_contains("12345");
    }

    #[test]
    fn logs_emit_at_correct_severity_levels() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CellTelemetry::emit("cell", CellOperation::Get, CellActivity::Error, None);
        capture.assert_contains("ERROR");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CellTelemetry::emit("cell", CellOperation::Get, CellActivity::ReloadTimedOut, None);
        capture.assert_contains("WARN");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CellTelemetry::emit("cell", CellOperation::Get, CellActivity::Loaded, None);
        capture.assert_contains("INFO");

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        CellTelemetry::emit("cell", CellOperation::Get, CellActivity::Hit, None);
        capture.assert_contains("DEBUG");
    }

    #[test]
    fn logging_disabled_emits_nothing() {
        let telemetry = CellTelemetry::new(false, None);

        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        telemetry.record("cell", CellOperation::Get, CellActivity::Hit, Some(Duration::from_secs(1)));

        assert!(capture.output().is_empty());
    }
}
