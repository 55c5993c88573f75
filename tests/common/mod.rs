//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, Request, Response};
use switchyard::config::ListenerConfig;
use switchyard::signals::PanicSink;
use switchyard::{Engine, HttpServer};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Build a request with an empty body.
pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Bytes> {
    request(Method::GET, uri)
}

pub fn body_text(response: &Response<Bytes>) -> String {
    String::from_utf8_lossy(response.body()).into_owned()
}

pub fn location(response: &Response<Bytes>) -> Option<&str> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
}

/// Panic sink that keeps every report.
#[derive(Debug, Default)]
pub struct CountingSink {
    reports: Mutex<Vec<String>>,
}

impl CountingSink {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

impl PanicSink for CountingSink {
    fn notify(&self, report: &str) {
        self.reports.lock().unwrap().push(report.to_string());
    }
}

/// Install a fresh counting sink on `engine`.
pub fn counting_sink(engine: &mut Engine) -> Arc<CountingSink> {
    let sink = Arc::new(CountingSink::default());
    engine.set_panic_sink(sink.clone());
    sink
}

/// Serve `engine` on an ephemeral port. Dropping the sender stops the server.
pub async fn spawn_server(engine: Engine) -> (SocketAddr, oneshot::Sender<()>) {
    let config = ListenerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        request_timeout_secs: 5,
        max_body_size: 64 * 1024,
    };
    let server = HttpServer::new(engine, config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = server
            .run(listener, async move {
                let _ = rx.await;
            })
            .await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, tx)
}
