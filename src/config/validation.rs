//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sizes > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function of the config

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::config::schema::{AppConfig, EngineConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("engine.max_form_memory must be greater than zero")]
    ZeroFormMemory,

    #[error("engine.signal_backlog must be greater than zero")]
    ZeroSignalBacklog,

    #[error("listener.bind_address '{0}' is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.request_timeout_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("listener.max_body_size must be greater than zero")]
    ZeroBodySize,

    #[error("observability.log_level '{0}' is not a valid filter")]
    InvalidLogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check the options read by the dispatch core.
pub fn validate_engine(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_engine(config, &mut errors);
    into_result(errors)
}

/// Check a whole application config.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    check_engine(&config.engine, &mut errors);

    let listener = &config.listener;
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(listener.bind_address.clone()));
    }
    if listener.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if listener.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodySize);
    }

    let observability = &config.observability;
    if EnvFilter::try_new(&observability.log_level).is_err() {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    into_result(errors)
}

fn check_engine(config: &EngineConfig, errors: &mut Vec<ValidationError>) {
    if config.max_form_memory == 0 {
        errors.push(ValidationError::ZeroFormMemory);
    }
    if config.signal_backlog == 0 {
        errors.push(ValidationError::ZeroSignalBacklog);
    }
}

fn into_result(errors: Vec<ValidationError>) -> Result<(), Vec<ValidationError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
