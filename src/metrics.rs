//! Metrics helpers for arbor.
//!
//! Thin wrappers around the `metrics` crate macros. No exporter is embedded;
//! the embedding application installs whichever recorder it wants and these
//! helpers become no-ops when none is installed.
//!
//! Provided metrics:
//! * `arbor_requests_total` (counter; `method`, `status`)
//! * `arbor_request_duration_seconds` (histogram; `method`)
//! * `arbor_validation_failures_total` (counter)
//! * `arbor_route_tree_reloads_total` (counter; `outcome`)
use std::time::{Duration, Instant};

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

pub const ARBOR_REQUESTS_TOTAL: &str = "arbor_requests_total";
pub const ARBOR_REQUEST_DURATION_SECONDS: &str = "arbor_request_duration_seconds";
pub const ARBOR_VALIDATION_FAILURES_TOTAL: &str = "arbor_validation_failures_total";
pub const ARBOR_ROUTE_TREE_RELOADS_TOTAL: &str = "arbor_route_tree_reloads_total";

/// Outcome label of a route tree reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied,
    Rejected,
}

impl ReloadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReloadOutcome::Applied => "applied",
            ReloadOutcome::Rejected => "rejected",
        }
    }
}

static DESCRIBED: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        ARBOR_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests served."
    );
    describe_histogram!(
        ARBOR_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests, routing and serialization included."
    );
    describe_counter!(
        ARBOR_VALIDATION_FAILURES_TOTAL,
        Unit::Count,
        "Request bodies rejected by an endpoint schema."
    );
    describe_counter!(
        ARBOR_ROUTE_TREE_RELOADS_TOTAL,
        Unit::Count,
        "Route tree reload attempts by outcome."
    );
});

pub fn increment_request_total(method: &str, status: u16) {
    counter!(
        ARBOR_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_request_duration(method: &str, duration: Duration) {
    histogram!(ARBOR_REQUEST_DURATION_SECONDS, "method" => method.to_string())
        .record(duration.as_secs_f64());
}

pub fn increment_validation_failures() {
    counter!(ARBOR_VALIDATION_FAILURES_TOTAL).increment(1);
}

pub fn record_route_reload(outcome: ReloadOutcome) {
    counter!(ARBOR_ROUTE_TREE_RELOADS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// RAII helper measuring inbound request duration.
pub struct RequestTimer {
    start: Instant,
    method: String,
}

impl RequestTimer {
    pub fn new(method: &str) -> Self {
        Self {
            start: Instant::now(),
            method: method.to_string(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(&self.method, self.start.elapsed());
    }
}

/// Register metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    Lazy::force(&DESCRIBED);
    tracing::debug!("Metric descriptions registered");
    Ok(())
}
