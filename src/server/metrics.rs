use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all waitlist metrics
const PREFIX: &str = "waitlist";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Subscription Metrics
    pub static ref SUBSCRIBER_SIGNUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_subscriber_signups_total"), "Signup attempts by outcome"),
        &["status"]
    ).expect("Failed to create subscriber_signups_total metric");

    pub static ref SUBSCRIBERS_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_subscribers_total"),
        "Number of persisted subscribers"
    ).expect("Failed to create subscribers_total metric");

    // GitHub Sync Metrics
    pub static ref GITHUB_SYNC_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_github_sync_runs_total"), "Snapshot sync runs by outcome"),
        &["status"]
    ).expect("Failed to create github_sync_runs_total metric");

    pub static ref GITHUB_SYNC_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_github_sync_duration_seconds"),
            "Snapshot sync duration in seconds"
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0])
    ).expect("Failed to create github_sync_duration_seconds metric");

    // Error Metrics
    pub static ref ERRORS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_errors_total"),
        "Total unexpected errors"
    ).expect("Failed to create errors_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Register all metrics - ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(SUBSCRIBER_SIGNUPS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(SUBSCRIBERS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(GITHUB_SYNC_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(GITHUB_SYNC_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));

    tracing::info!("Metrics system initialized");
}

/// Seed the subscriber gauge from the store at startup
pub fn init_subscriber_metrics(subscriber_count: usize) {
    SUBSCRIBERS_TOTAL.set(subscriber_count as f64);
    tracing::info!(
        "Subscriber metrics initialized: {} subscribers",
        subscriber_count
    );
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a signup attempt outcome ("created", "duplicate", "invalid", "error")
pub fn record_signup(status: &str) {
    SUBSCRIBER_SIGNUPS_TOTAL.with_label_values(&[status]).inc();
}

/// Update the persisted subscriber count
pub fn set_subscribers_total(count: usize) {
    SUBSCRIBERS_TOTAL.set(count as f64);
}

/// Record a snapshot sync run ("success" or "failure")
pub fn record_sync_run(status: &str, duration: Duration) {
    GITHUB_SYNC_RUNS_TOTAL.with_label_values(&[status]).inc();
    GITHUB_SYNC_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Record an unexpected error
pub fn record_error() {
    ERRORS_TOTAL.inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
