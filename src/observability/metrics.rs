//! Metrics collection and exposition.
//!
//! # Metrics
//! - `switchyard_requests_total` (counter): requests by method, status
//! - `switchyard_request_duration_seconds` (histogram): latency by method
//! - `switchyard_panics_total` (counter): handler panics caught at dispatch
//! - `switchyard_signals_dropped_total` (counter): signals lost to backpressure

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint started");
    Ok(())
}

pub fn record_request(method: &str, status: u16, latency: Duration) {
    counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("switchyard_request_duration_seconds", "method" => method.to_string())
        .record(latency.as_secs_f64());
}

pub fn record_panic() {
    counter!("switchyard_panics_total").increment(1);
}

pub fn record_signal_dropped(queue: &str) {
    counter!("switchyard_signals_dropped_total", "queue" => queue.to_string()).increment(1);
}
