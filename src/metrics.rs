use axum::response::IntoResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Requests served, by endpoint and outcome
    pub static ref REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dsaas_requests_total",
        "Total number of requests processed",
        &["endpoint", "status"]
    )
    .unwrap();

    /// Pipeline triggers, by outcome
    pub static ref PIPELINE_TRIGGERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "dsaas_pipeline_triggers_total",
        "Total number of pipeline trigger calls",
        &["outcome"]
    )
    .unwrap();

    /// End-to-end pipeline trigger duration in seconds
    pub static ref TRIGGER_DURATION: Histogram = register_histogram!(
        "dsaas_pipeline_trigger_duration_seconds",
        "Pipeline trigger duration in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();
}

/// Export metrics in Prometheus text format
pub fn export_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Metrics handler for /metrics endpoint
pub async fn metrics_handler() -> axum::response::Response {
    match export_metrics() {
        Ok(metrics) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            metrics,
        )
            .into_response(),
        Err(e) => (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to export metrics: {}", e),
        )
            .into_response(),
    }
}
