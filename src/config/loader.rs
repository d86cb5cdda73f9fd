//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_NETWORK: &str = "CROWDFUND_NETWORK";
pub const ENV_HORIZON_URL: &str = "CROWDFUND_HORIZON_URL";
pub const ENV_SOROBAN_RPC_URL: &str = "CROWDFUND_SOROBAN_RPC_URL";
pub const ENV_NETWORK_PASSPHRASE: &str = "CROWDFUND_NETWORK_PASSPHRASE";
pub const ENV_CONTRACT_ID: &str = "CROWDFUND_CONTRACT_ID";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// A missing file is not an error: defaults plus environment overrides are
/// used instead.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)?
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `CROWDFUND_*` overrides using the given variable lookup.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(name) = non_empty(ENV_NETWORK) {
        config.network.name = name;
    }
    if let Some(url) = non_empty(ENV_HORIZON_URL) {
        config.network.horizon_url = Some(url);
    }
    if let Some(url) = non_empty(ENV_SOROBAN_RPC_URL) {
        config.network.soroban_rpc_url = Some(url);
    }
    if let Some(passphrase) = non_empty(ENV_NETWORK_PASSPHRASE) {
        config.network.network_passphrase = Some(passphrase);
    }
    if let Some(contract) = non_empty(ENV_CONTRACT_ID) {
        config.network.contract_id = Some(contract);
    }
}
