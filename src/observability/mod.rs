//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine release ──▶ "message" queue  ──▶ logging (tracing, target switchyard::access)
//!                └─▶ "recorder" queue ──▶ metrics (requests, latency)
//! Dispatch recover ─────────────────────▶ metrics (panics)
//! Signal bus backpressure ──────────────▶ metrics (dropped signals)
//! ```
//!
//! # Design Decisions
//! - Structured logging through `tracing`, filtered by `EnvFilter`
//! - Metrics go through the `metrics` facade; the Prometheus exporter is optional

pub mod logging;
pub mod metrics;
