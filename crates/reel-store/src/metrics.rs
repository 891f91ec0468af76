//! Store request metrics.

use metrics::{counter, histogram};

/// Metric name constants.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "store_requests_total";
    pub const RETRIES_TOTAL: &str = "store_retries_total";
    pub const LATENCY_SECONDS: &str = "store_latency_seconds";
    pub const CLAIM_CONFLICTS_TOTAL: &str = "store_claim_conflicts_total";
}

/// Record a completed backend request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "operation" => operation.to_string()).record(latency_ms / 1000.0);
}

pub fn record_retry(operation: &str) {
    counter!(names::RETRIES_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// A queued row was taken by another claimer first.
pub fn record_claim_conflict() {
    counter!(names::CLAIM_CONFLICTS_TOTAL).increment(1);
}
