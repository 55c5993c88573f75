//! Request-side helpers.
//!
//! # Responsibilities
//! - Carry the peer address from the transport into the engine
//! - Identify the requester for access logs
//! - Parse query and url-encoded form values under a size limit

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::http::{header, Request};

/// Name of the request ID header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Peer address inserted into request extensions by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteAddr(pub SocketAddr);

/// Form parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("form body of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: usize, limit: u64 },
}

/// Who sent the request: `X-Real-IP`, then `X-Forwarded-For`, then the
/// peer address.
pub fn requester<B>(request: &Request<B>) -> String {
    let from_header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    from_header("x-real-ip")
        .or_else(|| from_header("x-forwarded-for"))
        .or_else(|| {
            request
                .extensions()
                .get::<RemoteAddr>()
                .map(|addr| addr.0.to_string())
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Request ID supplied by the client or an outer layer.
pub fn request_id<B>(request: &Request<B>) -> Option<&str> {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
}

/// Key/value pairs from the query string.
pub fn query_pairs<B>(request: &Request<B>) -> Vec<(String, String)> {
    request
        .uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

/// Key/value pairs from an `application/x-www-form-urlencoded` body.
///
/// Other content types yield no pairs.
pub fn body_pairs(request: &Request<Bytes>, limit: u64) -> Result<Vec<(String, String)>, FormError> {
    let is_form = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));
    if !is_form {
        return Ok(Vec::new());
    }

    let body = request.body();
    if body.len() as u64 > limit {
        return Err(FormError::TooLarge {
            size: body.len(),
            limit,
        });
    }

    Ok(url::form_urlencoded::parse(body).into_owned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_request(body: &'static str) -> Request<Bytes> {
        Request::builder()
            .method("POST")
            .uri("/submit?page=2&q=a%20b")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn test_requester_precedence() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "10.0.0.2")
            .body(Bytes::new())
            .unwrap();
        req.extensions_mut()
            .insert(RemoteAddr("127.0.0.1:9000".parse().unwrap()));
        assert_eq!(requester(&req), "10.0.0.2");

        req.headers_mut()
            .insert("x-real-ip", "10.0.0.1".parse().unwrap());
        assert_eq!(requester(&req), "10.0.0.1");

        let bare = Request::builder()
            .extension(RemoteAddr("127.0.0.1:9000".parse().unwrap()))
            .body(Bytes::new())
            .unwrap();
        assert_eq!(requester(&bare), "127.0.0.1:9000");
    }

    #[test]
    fn test_query_and_body_pairs() {
        let req = form_request("name=bob&color=blue+green");

        let query = query_pairs(&req);
        assert_eq!(query[0], ("page".to_string(), "2".to_string()));
        assert_eq!(query[1], ("q".to_string(), "a b".to_string()));

        let body = body_pairs(&req, 1024).unwrap();
        assert_eq!(body[1], ("color".to_string(), "blue green".to_string()));
    }

    #[test]
    fn test_body_over_limit() {
        let req = form_request("name=bob");
        assert_eq!(
            body_pairs(&req, 4),
            Err(FormError::TooLarge { size: 8, limit: 4 })
        );
    }
}
