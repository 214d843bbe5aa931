//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by endpoint, status
//! - `gateway_request_duration_seconds` (histogram): latency by endpoint
//! - `gateway_flow_executions_total` (counter): flow runs by flow, outcome
//! - `gateway_flow_duration_seconds` (histogram): flow latency by flow
//! - `gateway_step_duration_seconds` (histogram): step latency by flow, step
//! - `gateway_upstream_retries_total` (counter): retries by service
//! - `gateway_flow_rollbacks_total` (counter): rollback calls by flow, step,
//!   outcome
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(endpoint: &str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_flow(flow: &str, outcome: &'static str, start: Instant) {
    counter!(
        "gateway_flow_executions_total",
        "flow" => flow.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("gateway_flow_duration_seconds", "flow" => flow.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_step(flow: &str, step: &str, start: Instant) {
    histogram!(
        "gateway_step_duration_seconds",
        "flow" => flow.to_string(),
        "step" => step.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(service: &str) {
    counter!("gateway_upstream_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_rollback(flow: &str, step: &str, outcome: &'static str) {
    counter!(
        "gateway_flow_rollbacks_total",
        "flow" => flow.to_string(),
        "step" => step.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
