//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve the network profile so inconsistent endpoints fail at startup
//! - Keep failover endpoints on the selected network
//! - Validate value ranges (timeouts > 0, poll interval below timeout)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::AppConfig;
use crate::network;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let environment = match network::resolve(&config.network) {
        Ok(env) => Some(env),
        Err(e) => {
            errors.push(ValidationError::new("network", e.to_string()));
            None
        }
    };

    if config.ledger.request_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.request_timeout_secs", "must be greater than 0"));
    }
    for failover in &config.ledger.failover_urls {
        if url::Url::parse(failover).is_err() {
            errors.push(ValidationError::new(
                "ledger.failover_urls",
                format!("invalid URL '{}'", failover),
            ));
            continue;
        }
        if let Some(env) = &environment {
            if let Err(e) = network::check_endpoint_network(&env.network_id, "ledger.failover_urls", failover) {
                errors.push(ValidationError::new("ledger.failover_urls", e.to_string()));
            }
        }
    }
    if config.ledger.retry_base_delay_ms > config.ledger.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "ledger.retry_base_delay_ms",
            "must not exceed retry_max_delay_ms",
        ));
    }

    if config.confirmation.poll_interval_ms == 0 {
        errors.push(ValidationError::new("confirmation.poll_interval_ms", "must be greater than 0"));
    }
    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be greater than 0"));
    } else if config.confirmation.poll_interval() > config.confirmation.timeout() {
        errors.push(ValidationError::new(
            "confirmation.poll_interval_ms",
            "must not exceed confirmation.timeout_secs",
        ));
    }

    if config.wallets.enabled.is_empty() {
        errors.push(ValidationError::new("wallets.enabled", "at least one wallet kind is required"));
    }

    if config.display.fraction_digits > 18 {
        errors.push(ValidationError::new("display.fraction_digits", "must be at most 18"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
