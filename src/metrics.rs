/// Metrics and telemetry for device detection
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Detection outcomes (cache hit, fetched, each error kind)
/// - Cache hit/miss/error counts and failed writes
/// - Upstream request latency

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use tracing::warn;

lazy_static! {
    /// Detections by outcome
    pub static ref DETECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "device_detections_total",
        "Total number of device detections by outcome",
        &["outcome"]
    )
    .unwrap();

    /// Cache lookups by result (hit, miss, error)
    pub static ref CACHE_ACCESS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "device_cache_access_total",
        "Total number of device cache lookups by result",
        &["result"]
    )
    .unwrap();

    pub static ref CACHE_WRITE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "device_cache_write_failures_total",
        "Total number of failed device cache writes"
    )
    .unwrap();

    /// Round trip to the WURFL Cloud API in seconds
    pub static ref UPSTREAM_REQUEST_DURATION_SECONDS: Histogram = register_histogram!(
        "device_upstream_request_duration_seconds",
        "WURFL Cloud request latencies in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record the outcome of one detection
pub fn record_detection(outcome: &str) {
    DETECTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cache_access(result: &str) {
    CACHE_ACCESS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_cache_write_failure() {
    CACHE_WRITE_FAILURES_TOTAL.inc();
}

pub fn record_upstream_request(duration: f64) {
    UPSTREAM_REQUEST_DURATION_SECONDS.observe(duration);
}
