//! Request metrics.
//!
//! Recorded through the `metrics` facade; whichever recorder the application
//! installs receives them. Without a recorder every call is a no-op.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `translucent_requests_total` | Counter | `scheme`, `status` |
//! | `translucent_request_duration_seconds` | Histogram | `scheme` |
//! | `translucent_in_flight_requests` | Gauge | - |

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Total requests counter.
pub const REQUESTS_TOTAL: &str = "translucent_requests_total";

/// Request duration histogram.
pub const REQUEST_DURATION_SECONDS: &str = "translucent_request_duration_seconds";

/// In-flight requests gauge.
pub const IN_FLIGHT_REQUESTS: &str = "translucent_in_flight_requests";

/// Registers descriptions for the standard metrics with the installed
/// recorder.
pub fn describe_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of resource requests processed");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Resource request duration in seconds"
    );
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of resource requests currently being processed"
    );
}

/// Records a completed request.
pub fn record_request(scheme: &str, status: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "scheme" => scheme.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "scheme" => scheme.to_string())
        .record(duration.as_secs_f64());
}

/// Increments the in-flight gauge.
pub fn increment_in_flight() {
    gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
}

/// Decrements the in-flight gauge.
pub fn decrement_in_flight() {
    gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
}

/// Counts a request as in flight until dropped.
///
/// Dropping on every exit path, including errors and cancelled futures,
/// keeps the gauge balanced.
#[derive(Debug)]
#[must_use = "the request stops counting as in flight when the guard is dropped"]
pub struct InFlightGuard(());

impl InFlightGuard {
    /// Increments the gauge and returns the guard.
    pub fn new() -> Self {
        increment_in_flight();
        Self(())
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        decrement_in_flight();
    }
}
