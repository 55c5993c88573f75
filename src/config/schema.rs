//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};

use crate::config::loader::ConfigError;
use crate::config::validation::validate_engine;

/// Root configuration for the demo server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Dispatch behaviour.
    pub engine: EngineConfig,

    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Options read by the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Serve a page with the panic message and backtrace on handler panics.
    pub serve_panic: bool,

    /// Redirect `/x/` to `/x` (and back) when only the other form is registered.
    pub redirect_trailing_slash: bool,

    /// Redirect to the case-corrected, cleaned path when one matches.
    pub redirect_fixed_path: bool,

    /// Render status chains as HTML pages instead of bare status lines.
    pub html_status: bool,

    /// Emit an access log line for every request.
    pub logging_on: bool,

    /// Largest url-encoded form body that will be parsed, in bytes.
    pub max_form_memory: u64,

    /// Pending signals allowed before new ones are dropped.
    pub signal_backlog: usize,

    /// Idle contexts kept for reuse.
    pub pool_max_idle: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            serve_panic: true,
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            html_status: false,
            logging_on: false,
            max_form_memory: 1_000_000,
            signal_backlog: 65_536,
            pool_max_idle: 1024,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Named setters over [`EngineConfig`]; `build` validates the result.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn serve_panic(mut self, on: bool) -> Self {
        self.config.serve_panic = on;
        self
    }

    pub fn redirect_trailing_slash(mut self, on: bool) -> Self {
        self.config.redirect_trailing_slash = on;
        self
    }

    pub fn redirect_fixed_path(mut self, on: bool) -> Self {
        self.config.redirect_fixed_path = on;
        self
    }

    pub fn html_status(mut self, on: bool) -> Self {
        self.config.html_status = on;
        self
    }

    pub fn logging_on(mut self, on: bool) -> Self {
        self.config.logging_on = on;
        self
    }

    pub fn max_form_memory(mut self, bytes: u64) -> Self {
        self.config.max_form_memory = bytes;
        self
    }

    pub fn signal_backlog(mut self, signals: usize) -> Self {
        self.config.signal_backlog = signals;
        self
    }

    pub fn pool_max_idle(mut self, contexts: usize) -> Self {
        self.config.pool_max_idle = contexts;
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        validate_engine(&self.config).map_err(ConfigError::Validation)?;
        Ok(self.config)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
