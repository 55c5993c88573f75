//! Response writer handed to handlers.
//!
//! # Responsibilities
//! - Buffer status, headers and body for one request
//! - Track whether the status line has been committed
//! - Convert the buffered state into an `http::Response`
//!
//! # Design Decisions
//! - The first write commits the status; later status changes are ignored
//! - The writer lives inside the pooled context and is reset between requests

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

/// Write-once response state.
#[derive(Debug)]
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headers that will be sent with the response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Convenience for `headers_mut().insert(..)`.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Set the pending status. Ignored once the response has been written.
    pub fn write_header(&mut self, status: StatusCode) {
        if self.committed {
            if status != self.status {
                tracing::debug!(
                    current = %self.status,
                    ignored = %status,
                    "Response already written, status change ignored"
                );
            }
            return;
        }
        self.status = status;
    }

    /// Commit the pending status without writing a body.
    pub fn write_header_now(&mut self) {
        self.committed = true;
    }

    /// Append to the body, committing the status first.
    pub fn write(&mut self, data: &[u8]) -> usize {
        self.write_header_now();
        self.body.extend_from_slice(data);
        data.len()
    }

    pub fn write_str(&mut self, data: &str) -> usize {
        self.write(data.as_bytes())
    }

    /// Whether the status line has been committed.
    pub fn written(&self) -> bool {
        self.committed
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Bytes written to the body so far.
    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Move the buffered response out, leaving the writer empty.
    pub fn take_response(&mut self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(std::mem::take(&mut self.body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.headers);
        self.committed = true;
        response
    }

    pub(crate) fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.headers.clear();
        self.body.clear();
        self.committed = false;
    }
}
