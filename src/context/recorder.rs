//! Per-request timing and access records.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::http::{Method, Request, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::request::{request_id, requester};

/// Serialized summary of one request, emitted on the `recorder` queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub request_id: String,
    /// Milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    pub latency_micros: u64,
    pub status: u16,
    pub method: String,
    pub path: String,
    pub requester: String,
}

/// Timing state reused across requests.
#[derive(Debug)]
pub struct Recorder {
    request_id: String,
    start: Instant,
    started_at: SystemTime,
    latency: Duration,
    status: StatusCode,
    method: Method,
    path: String,
    requester: String,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            request_id: String::new(),
            start: Instant::now(),
            started_at: SystemTime::now(),
            latency: Duration::ZERO,
            status: StatusCode::OK,
            method: Method::GET,
            path: String::new(),
            requester: String::new(),
        }
    }
}

impl Recorder {
    /// Arm a fresh start timestamp and request ID.
    pub(crate) fn start<B>(&mut self, request: &Request<B>) {
        self.start = Instant::now();
        self.started_at = SystemTime::now();
        self.request_id.clear();
        match request_id(request) {
            Some(id) => self.request_id.push_str(id),
            None => self.request_id.push_str(&Uuid::new_v4().to_string()),
        }
    }

    /// Stop the clock and capture what the access log needs.
    pub(crate) fn finish<B>(&mut self, request: &Request<B>, status: StatusCode) {
        self.latency = self.start.elapsed();
        self.status = status;
        self.method = request.method().clone();
        self.path.clear();
        self.path.push_str(request.uri().path());
        self.requester = requester(request);
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Time since `start`, or the final latency once finished.
    pub fn elapsed(&self) -> Duration {
        if self.latency.is_zero() {
            self.start.elapsed()
        } else {
            self.latency
        }
    }

    pub fn record(&self) -> Record {
        Record {
            request_id: self.request_id.clone(),
            started_at_ms: self
                .started_at
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            latency_micros: self.latency.as_micros() as u64,
            status: self.status.as_u16(),
            method: self.method.to_string(),
            path: self.path.clone(),
            requester: self.requester.clone(),
        }
    }

    /// One-line access log entry.
    pub fn log_line(&self) -> String {
        format!(
            "{:>3} | {:>12?} | {} | {:<7} {} | {}",
            self.status.as_u16(),
            self.latency,
            self.requester,
            self.method.as_str(),
            self.path,
            self.request_id,
        )
    }

    pub(crate) fn reset(&mut self) {
        self.request_id.clear();
        self.latency = Duration::ZERO;
        self.status = StatusCode::OK;
        self.method = Method::GET;
        self.path.clear();
        self.requester.clear();
    }
}
