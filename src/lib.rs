//! Switchyard: the request-dispatch core of an embeddable HTTP engine.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                      ENGINE                          │
//!   Request       │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   ──────────────┼─▶│  pool   │──▶│ routing  │──▶│  route chain     │   │
//!                 │  │ acquire │   │  tree    │   │  (Ctx handlers)  │   │
//!                 │  └─────────┘   └────┬─────┘   └────────┬─────────┘   │
//!                 │                     │ miss/panic       │             │
//!                 │                     ▼                  ▼             │
//!                 │              ┌────────────┐    ┌──────────────┐      │
//!                 │              │   group    │───▶│ status chain │      │
//!                 │              │ escalation │    │ before..after│      │
//!                 │              └────────────┘    └──────┬───────┘      │
//!   Response      │  ┌─────────┐                          │              │
//!   ◀─────────────┼──│ release │◀─────────────────────────┘              │
//!                 │  └────┬────┘                                         │
//!                 │       ▼                                              │
//!                 │  ┌──────────┐   message / recorder / panic queues    │
//!                 │  │ signals  │──▶ tracing, metrics, panic sink        │
//!                 │  └──────────┘                                        │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//! ```no_run
//! use axum::body::Bytes;
//! use axum::http::{Request, StatusCode};
//! use switchyard::{handler, Engine};
//!
//! let mut engine = Engine::new();
//! engine.root().get("/hello/:name", handler(|ctx| {
//!     let body = format!("hello {}", ctx.param("name").unwrap_or("stranger"));
//!     ctx.writer_mut().write_str(&body);
//! }));
//!
//! let response = engine.dispatch(Request::get("/hello/you").body(Bytes::new()).unwrap());
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod group;
pub mod http;
pub mod observability;
pub mod routing;
pub mod signals;

pub use config::{AppConfig, EngineConfig};
pub use context::{handler, Ctx, Handler};
pub use engine::{Engine, EngineError, GroupMut};
pub use group::GroupId;
pub use http::HttpServer;
