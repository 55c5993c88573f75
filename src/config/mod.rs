//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → EngineConfig moved into the Engine
//!
//! Programmatic use:
//!     EngineConfig::builder().html_status(true).build()
//!     → validation.rs
//!     → Engine::with_config
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the engine is built
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AppConfig, EngineConfig, EngineConfigBuilder, ListenerConfig, ObservabilityConfig};
pub use validation::ValidationError;
