//! Prometheus metrics for the ranking pipeline.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, HistogramTimer,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    static ref FEED_REQUESTS_TOTAL: IntCounter = register_int_counter!(
        "feed_ranking_requests_total",
        "Total feed ranking requests served"
    )
    .expect("Failed to register feed request counter");
    static ref FEED_FALLBACKS_TOTAL: IntCounter = register_int_counter!(
        "feed_ranking_fallbacks_total",
        "Feed requests served by the chronological fallback"
    )
    .expect("Failed to register fallback counter");
    static ref SOURCE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_ranking_source_failures_total",
        "Candidate source failures and timeouts",
        &["source"]
    )
    .expect("Failed to register source failure counter");
    static ref FEED_DURATION_SECONDS: Histogram = register_histogram!(
        "feed_ranking_duration_seconds",
        "End-to-end feed request duration",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register feed duration histogram");
}

pub fn record_feed_request() {
    FEED_REQUESTS_TOTAL.inc();
}

pub fn record_fallback() {
    FEED_FALLBACKS_TOTAL.inc();
}

pub fn record_source_failure(source: &str) {
    SOURCE_FAILURES_TOTAL.with_label_values(&[source]).inc();
}

pub fn feed_timer() -> HistogramTimer {
    FEED_DURATION_SECONDS.start_timer()
}

/// Prometheus text exposition of the default registry.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    encoder
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
