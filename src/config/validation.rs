//! Configuration validation.
//!
//! # Responsibilities
//! - Reject startup when a required value is absent
//! - Validate value ranges (window > 0, port numeric, drain timeout > 0)
//! - Check that URLs and addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs after environment overrides, before anything connects

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),

    #[error("listener port `{0}` is not a valid port number")]
    InvalidPort(String),

    #[error("external base URL `{0}` is not a valid URL")]
    InvalidBaseUrl(String),

    #[error("rate_limit.{0} must be greater than zero")]
    ZeroRateLimit(&'static str),

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,

    #[error("admission.api_prefix `{0}` must start with '/'")]
    InvalidApiPrefix(String),
}

/// Validate a fully loaded configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port.trim().is_empty() {
        errors.push(ValidationError::Missing("listener.port (PORT)"));
    } else if config.listener.port.trim().parse::<u16>().is_err() {
        errors.push(ValidationError::InvalidPort(config.listener.port.clone()));
    }

    if config.app.external_base_url.trim().is_empty() {
        errors.push(ValidationError::Missing("app.external_base_url (APP_BASE_URL)"));
    } else if Url::parse(&config.app.external_base_url).is_err() {
        errors.push(ValidationError::InvalidBaseUrl(
            config.app.external_base_url.clone(),
        ));
    }

    if config.counter_store.address.trim().is_empty() {
        errors.push(ValidationError::Missing("counter_store.address (REDIS_URL)"));
    }

    if config.persistence.connection_string.trim().is_empty() {
        errors.push(ValidationError::Missing(
            "persistence.connection_string (DATABASE_URL or DB_*)",
        ));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroRateLimit("max_requests"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroRateLimit("window_secs"));
        }
    }

    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }

    if !config.admission.api_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidApiPrefix(
            config.admission.api_prefix.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
