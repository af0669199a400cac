//! Error reporter that logs and counts.

use tradefeed_telemetry::Metrics;
use tradefeed_ws::{ErrorReport, ErrorReporter, TracingReporter};

/// Logs every report through `tracing` and counts it in Prometheus.
///
/// Faults count towards `tradefeed_errors_total`. A scheduled reconnect
/// counts towards `tradefeed_reconnect_total` under its close reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsReporter {
    log: TracingReporter,
}

impl ErrorReporter for MetricsReporter {
    fn report(&self, report: ErrorReport) {
        match &report {
            ErrorReport::Reconnect { socket, reason, .. } => Metrics::ws_reconnect(socket, reason),
            other => Metrics::error(other.kind()),
        }
        self.log.report(report);
    }
}
