//! Queues installed on every engine.

use std::time::Duration;

use axum::body::Bytes;

use super::bus::SignalBus;
use crate::context::Record;
use crate::observability::metrics;

/// Access log lines.
pub const MESSAGE_QUEUE: &str = "message";
/// JSON request records.
pub const RECORDER_QUEUE: &str = "recorder";
/// Panic reports.
pub const PANIC_QUEUE: &str = "panic";

pub fn install(bus: &SignalBus) {
    bus.register(MESSAGE_QUEUE, log_message);
    bus.register(RECORDER_QUEUE, record_metrics);
    bus.register(PANIC_QUEUE, log_panic);
}

fn log_message(payload: Bytes) {
    tracing::info!(target: "switchyard::access", "{}", String::from_utf8_lossy(&payload));
}

fn record_metrics(payload: Bytes) {
    match serde_json::from_slice::<Record>(&payload) {
        Ok(record) => metrics::record_request(
            &record.method,
            record.status,
            Duration::from_micros(record.latency_micros),
        ),
        Err(e) => tracing::warn!(error = %e, "Malformed request record"),
    }
}

fn log_panic(payload: Bytes) {
    tracing::error!(target: "switchyard::panic", "{}", String::from_utf8_lossy(&payload));
}
