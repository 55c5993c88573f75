//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request<Bytes>
//!     → ContextPool::acquire + populate
//!     → RouteTable (per-method tree)
//!         ├─ hit      → route chain (group = route's group)
//!         ├─ near miss → 301/307 redirect
//!         └─ miss     → 404 chain on the root group
//!     → panic?  → 500 chain with the captured backtrace
//!     → release: recorder, signals, back to the pool
//!     → Response<Bytes>
//! ```

#[allow(clippy::module_inception)]
pub mod engine;
pub mod recover;

pub use engine::{Engine, GroupMut, Route};

use crate::config::ConfigError;
use crate::group::StatusError;
use crate::routing::RouteError;

/// Setup problems reported before serving.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid status table: {0}")]
    Status(#[from] StatusError),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid route: {0}")]
    Route(#[from] RouteError),
}
