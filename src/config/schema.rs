//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! donation orchestrator. All types derive Serde traits for deserialization
//! from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::wallet::WalletKind;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Network profile selection and endpoint overrides.
    pub network: NetworkConfig,

    /// Ledger endpoint client settings.
    pub ledger: LedgerConfig,

    /// Confirmation polling settings.
    pub confirmation: ConfirmationConfig,

    /// Wallet kinds offered to the user.
    pub wallets: WalletsConfig,

    /// Amount rendering.
    pub display: DisplayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Network selection.
///
/// `name` picks a built-in profile (`testnet`, `public`) or `custom`. The
/// optional fields override the profile; a `custom` network must set all of
/// them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub name: String,
    pub horizon_url: Option<String>,
    pub soroban_rpc_url: Option<String>,
    pub network_passphrase: Option<String>,
    pub contract_id: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            name: "testnet".to_string(),
            horizon_url: None,
            soroban_rpc_url: None,
            network_passphrase: None,
            contract_id: None,
        }
    }
}

/// Ledger and contract endpoint client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Extra ledger endpoints used for read-only queries when the primary fails.
    pub failover_urls: Vec<String>,

    /// Retries for read-only queries after the first attempt.
    pub read_retries: u32,

    /// Base delay for read retry backoff.
    pub retry_base_delay_ms: u64,

    /// Cap for read retry backoff.
    pub retry_max_delay_ms: u64,

    /// Inclusion fee per operation in minor units.
    pub base_fee: u64,
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            failover_urls: Vec::new(),
            read_retries: 2,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 2000,
            base_fee: 100,
        }
    }
}

/// Confirmation polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Interval between status checks.
    pub poll_interval_ms: u64,

    /// Give up (outcome unknown) after this long.
    pub timeout_secs: u64,
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletsConfig {
    pub enabled: Vec<WalletKind>,
}

impl Default for WalletsConfig {
    fn default() -> Self {
        Self {
            enabled: vec![WalletKind::Freighter, WalletKind::XBull, WalletKind::Albedo],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Fractional digits used when rendering amounts.
    pub fraction_digits: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fraction_digits: 7 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.network.name, "testnet");
        assert_eq!(config.confirmation.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.confirmation.timeout(), Duration::from_secs(30));
        assert_eq!(config.wallets.enabled.len(), 3);
        assert_eq!(config.display.fraction_digits, 7);
    }

    #[test]
    fn test_minimal_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [network]
            name = "public"
            contract_id = "CDBWA6QGQZZR5XLFESB7ANVIP5O4IRF56X6VVLCVSE2B6YL7MNWCFKLV"

            [confirmation]
            timeout_secs = 60

            [wallets]
            enabled = ["freighter"]

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.network.name, "public");
        assert_eq!(config.confirmation.timeout_secs, 60);
        assert_eq!(config.confirmation.poll_interval_ms, 2000);
        assert_eq!(config.wallets.enabled, vec![WalletKind::Freighter]);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.ledger.request_timeout_secs, 10);
    }
}
