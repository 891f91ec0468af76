//! Pipeline metrics.

use metrics::{counter, histogram};

pub mod names {
    pub const INGEST_ITEMS_TOTAL: &str = "reel_ingest_items_total";
    pub const PROCESSING_RUNS_TOTAL: &str = "reel_processing_runs_total";
    pub const METADATA_RUNS_TOTAL: &str = "reel_metadata_runs_total";
    pub const PUBLISH_ATTEMPTS_TOTAL: &str = "reel_publish_attempts_total";
    pub const PUBLISH_DURATION_SECONDS: &str = "reel_publish_duration_seconds";
    pub const TRIM_FALLBACKS_TOTAL: &str = "reel_trim_fallbacks_total";
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}

pub fn record_ingest(ok: bool) {
    counter!(names::INGEST_ITEMS_TOTAL, "outcome" => outcome(ok)).increment(1);
}

pub fn record_processing(ok: bool) {
    counter!(names::PROCESSING_RUNS_TOTAL, "outcome" => outcome(ok)).increment(1);
}

pub fn record_metadata(ok: bool) {
    counter!(names::METADATA_RUNS_TOTAL, "outcome" => outcome(ok)).increment(1);
}

pub fn record_publish(ok: bool, duration_secs: f64) {
    counter!(names::PUBLISH_ATTEMPTS_TOTAL, "outcome" => outcome(ok)).increment(1);
    histogram!(names::PUBLISH_DURATION_SECONDS).record(duration_secs);
}

pub fn record_trim_fallback() {
    counter!(names::TRIM_FALLBACKS_TOTAL).increment(1);
}
