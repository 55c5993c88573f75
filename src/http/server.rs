//! HTTP server setup.
//!
//! # Responsibilities
//! - Validate and freeze the engine before serving
//! - Create the Axum router whose fallback hands every request to the engine
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve with graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ListenerConfig;
use crate::engine::{Engine, EngineError};
use crate::http::request::RemoteAddr;

/// Application state injected into the fallback handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub max_body_size: usize,
}

/// Serves an [`Engine`] over HTTP.
pub struct HttpServer {
    engine: Arc<Engine>,
    config: ListenerConfig,
}

impl HttpServer {
    /// Validate `engine` and take ownership of it for serving.
    pub fn new(engine: Engine, config: ListenerConfig) -> Result<Self, EngineError> {
        engine.validate()?;
        Ok(Self {
            engine: Arc::new(engine),
            config,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let state = AppState {
            engine: Arc::clone(&self.engine),
            max_body_size: self.config.max_body_size,
        };

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(self.config.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Collect the body, then run the engine on a blocking thread.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Request body rejected");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    if let Some(addr) = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0) {
        parts.extensions.insert(RemoteAddr(addr));
    }
    let request = Request::from_parts(parts, bytes);

    let engine = Arc::clone(&state.engine);
    match tokio::task::spawn_blocking(move || engine.dispatch(request)).await {
        Ok(response) => response.map(Body::from),
        Err(e) => {
            tracing::error!(error = %e, "Dispatch task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
