//! Prometheus metrics.
//!
//! The recorder is installed once per process by [`init_metrics`]; before
//! that every `record_*` call is a no-op. `/metrics` renders the text
//! exposition through the stored handle.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

    pub const CACHE_HITS_TOTAL: &str = "geocache_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "geocache_cache_misses_total";
    pub const CACHE_FALLBACKS_TOTAL: &str = "geocache_cache_fallbacks_total";
    pub const CACHE_REPOPULATE_FAILURES_TOTAL: &str = "geocache_cache_repopulate_failures_total";

    pub const STORE_CALLS_TOTAL: &str = "geocache_store_calls_total";
}

/// Latency buckets in seconds. Cache hits land in the first few.
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

fn install() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(names::HTTP_REQUEST_DURATION_SECONDS.to_string()),
            LATENCY_BUCKETS,
        )?
        .install_recorder()
}

fn describe() {
    describe_counter!(names::HTTP_REQUESTS_TOTAL, "HTTP requests by route and status");
    describe_histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request latency by route"
    );
    describe_counter!(names::CACHE_HITS_TOTAL, "Reads answered from the index");
    describe_counter!(names::CACHE_MISSES_TOTAL, "Reads the index had nothing for");
    describe_counter!(
        names::CACHE_FALLBACKS_TOTAL,
        "Reads that fell back to the store after a cache failure"
    );
    describe_counter!(
        names::CACHE_REPOPULATE_FAILURES_TOTAL,
        "Store results that could not be written back to the index"
    );
    describe_counter!(names::STORE_CALLS_TOTAL, "Calls into the backing store");
}

/// Install the Prometheus recorder. Returns `false` when it was already
/// installed or installation failed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }
    match install() {
        Ok(handle) => {
            if PROMETHEUS_HANDLE.set(handle).is_err() {
                return false;
            }
            describe();
            tracing::info!("Prometheus metrics initialized");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install Prometheus recorder");
            false
        }
    }
}

/// `None` until [`init_metrics`] succeeded.
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(PrometheusHandle::render)
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// `route` is the matched route template, never the raw path.
pub fn record_http_request(method: &str, route: &str, status: u16, elapsed: Duration) {
    counter!(
        names::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status_class" => status_class(status)
    )
    .increment(1);
    histogram!(
        names::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(elapsed.as_secs_f64());
}

/// `kind` is the filter level: all, country, state, city, area or id.
pub fn record_cache_hit(kind: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_cache_miss(kind: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "kind" => kind).increment(1);
}

pub fn record_cache_fallback(operation: &'static str) {
    counter!(names::CACHE_FALLBACKS_TOTAL, "operation" => operation).increment(1);
}

pub fn record_repopulate_failure() {
    counter!(names::CACHE_REPOPULATE_FAILURES_TOTAL).increment(1);
}

pub fn record_store_query(operation: &'static str) {
    counter!(names::STORE_CALLS_TOTAL, "operation" => operation).increment(1);
}
