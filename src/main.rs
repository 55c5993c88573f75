//! Switchyard demo server.
//!
//! Loads a TOML configuration, registers a few demonstration routes and
//! serves them until Ctrl+C.

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use switchyard::config::{load_config, AppConfig};
use switchyard::observability::{logging, metrics};
use switchyard::{handler, Engine, HttpServer};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Demo server for the Switchyard dispatch engine", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability)?;
    tracing::info!("switchyard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        html_status = config.engine.html_status,
        logging_on = config.engine.logging_on,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(demo_engine(config.engine.clone()), config.listener.clone())?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_engine(config: switchyard::EngineConfig) -> Engine {
    let mut engine = Engine::with_config(config);

    let mut root = engine.root();
    root.get(
        "/",
        handler(|ctx| {
            ctx.writer_mut().write_str("switchyard\n");
        }),
    );
    root.get(
        "/hello/:name",
        handler(|ctx| {
            let body = format!("hello, {}\n", ctx.param("name").unwrap_or("stranger"));
            ctx.writer_mut().write_str(&body);
        }),
    );
    root.post(
        "/echo",
        handler(|ctx| {
            let body = ctx
                .form()
                .iter()
                .map(|(k, v)| format!("{k}={v}\n"))
                .collect::<String>();
            ctx.writer_mut().write_str(&body);
        }),
    );
    root.get("/panic", handler(|_| panic!("demo panic")));

    let mut tea = root.group("/tea");
    tea.get("/brew", handler(|ctx| ctx.status(StatusCode::IM_A_TEAPOT)));
    tea.status(
        StatusCode::IM_A_TEAPOT,
        [handler(|ctx| {
            let path = ctx.request().uri().path().to_string();
            ctx.error("coffee requested", json!({ "path": path }));
        })],
    );

    engine
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("Shutdown signal received");
}
