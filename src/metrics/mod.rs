//! Prometheus metrics
//!
//! HTTP request metrics live here; the indexer and the scheduler keep their
//! own collectors next to their code. Everything is registered in the
//! default Prometheus registry and exported by [`gather_metrics`].

mod middleware;

pub use middleware::track_metrics;

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec,
};

lazy_static! {
    /// Total number of HTTP requests received
    ///
    /// Labels: method, path, status_code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "villagerdb_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status_code"]
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration in seconds
    ///
    /// Labels: method, path
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "villagerdb_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Number of requests currently being served
    pub static ref HTTP_REQUESTS_IN_FLIGHT: Gauge = register_gauge!(
        "villagerdb_http_requests_in_flight",
        "Number of HTTP requests currently being served"
    )
    .expect("Failed to create HTTP_REQUESTS_IN_FLIGHT metric");
}

/// Register every collector up front so `/metrics` shows them before first use
pub fn init_metrics() {
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&HTTP_REQUESTS_IN_FLIGHT);
    crate::indexer::init_indexer_metrics();
    crate::scheduler::init_scheduler_metrics();

    tracing::info!("Prometheus metrics initialized");
}

/// Render all registered metrics in the Prometheus text exposition format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
