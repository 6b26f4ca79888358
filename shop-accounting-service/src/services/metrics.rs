//! Prometheus metrics for shop-accounting-service.

use once_cell::sync::Lazy;
use prometheus::{
    histogram_opts, opts, register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec,
    IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;

/// Database query duration histogram
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "shop_accounting_db_query_duration_seconds",
            "Database query duration"
        ),
        &["operation"]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Requests by method, matched route and status
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        opts!("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL")
});

pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        histogram_opts!(
            "http_request_duration_seconds",
            "HTTP request duration in seconds"
        ),
        &["method", "path", "status"]
    )
    .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS")
});

/// Matrix build/replace counter
pub static MATRIX_OPERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Persisted entries that could not be placed in a matrix
pub static ENTRY_ANOMALIES_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Error counter for alerting
pub static ERRORS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize all metrics. Call once at startup.
pub fn init_metrics() {
    MATRIX_OPERATIONS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "shop_accounting_matrix_operations_total",
                "Matrix operations by operation and outcome"
            ),
            &["operation", "status"]
        )
        .expect("Failed to register MATRIX_OPERATIONS_TOTAL")
    });

    ENTRY_ANOMALIES_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "shop_accounting_entry_anomalies_total",
                "Persisted entries left out of a matrix"
            ),
            &["reason"]
        )
        .expect("Failed to register ENTRY_ANOMALIES_TOTAL")
    });

    ERRORS_TOTAL.get_or_init(|| {
        register_int_counter_vec!(
            opts!(
                "shop_accounting_errors_total",
                "Total errors by type for alerting"
            ),
            &["error_type"]
        )
        .expect("Failed to register ERRORS_TOTAL")
    });

    let _ = &*DB_QUERY_DURATION;
    let _ = &*HTTP_REQUESTS_TOTAL;
    let _ = &*HTTP_REQUEST_DURATION_SECONDS;
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_matrix_operation(operation: &str, status: &str) {
    if let Some(counter) = MATRIX_OPERATIONS_TOTAL.get() {
        counter.with_label_values(&[operation, status]).inc();
    }
}

pub fn record_entry_anomaly(reason: &str) {
    if let Some(counter) = ENTRY_ANOMALIES_TOTAL.get() {
        counter.with_label_values(&[reason]).inc();
    }
}

/// Record an error for alerting.
pub fn record_error(error_type: &str) {
    if let Some(counter) = ERRORS_TOTAL.get() {
        counter.with_label_values(&[error_type]).inc();
    }
}
