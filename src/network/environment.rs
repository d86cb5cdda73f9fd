//! Resolution of the active network environment.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

use crate::config::schema::NetworkConfig;
use crate::network::profiles::{self, NetworkProfile};
use crate::primitives::{AddressError, ContractAddress};

/// Why a network configuration cannot be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvironmentError {
    #[error("unknown network '{0}' (expected testnet, public or custom)")]
    UnknownNetwork(String),

    #[error("required field '{0}' is not set")]
    MissingField(&'static str),

    #[error("{field} '{value}' belongs to the {owner} network, not {selected}")]
    MixedProfiles {
        field: &'static str,
        value: String,
        owner: &'static str,
        selected: String,
    },

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("contract_id is invalid: {0}")]
    InvalidContract(AddressError),
}

/// Which network the environment points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Testnet,
    Public,
    Custom,
}

impl NetworkId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkId::Testnet => "testnet",
            NetworkId::Public => "public",
            NetworkId::Custom => "custom",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable connection parameters for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkEnvironment {
    pub network_id: NetworkId,
    pub ledger_endpoint_url: Url,
    pub contract_rpc_url: Url,
    pub network_passphrase: String,
    pub contract_id: ContractAddress,
}

impl NetworkEnvironment {
    /// The subset of the environment a wallet needs to sign.
    pub fn context(&self) -> NetworkContext {
        NetworkContext {
            network_id: self.network_id.clone(),
            network_passphrase: self.network_passphrase.clone(),
        }
    }

    pub fn is_testnet(&self) -> bool {
        self.network_id == NetworkId::Testnet
    }
}

/// Network identity passed along with every signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkContext {
    pub network_id: NetworkId,
    pub network_passphrase: String,
}

/// Resolve the configured profile and overrides into one consistent snapshot.
pub fn resolve(config: &NetworkConfig) -> Result<NetworkEnvironment, EnvironmentError> {
    let name = config.name.trim().to_ascii_lowercase();
    let name = if name.is_empty() { "testnet".to_string() } else { name };

    let profile = profiles::lookup(&name);
    let network_id = match profile {
        Some(p) if p.name == profiles::TESTNET.name => NetworkId::Testnet,
        Some(_) => NetworkId::Public,
        None if name == "custom" => NetworkId::Custom,
        None => return Err(EnvironmentError::UnknownNetwork(config.name.clone())),
    };

    let horizon = pick(
        "horizon_url",
        config.horizon_url.as_deref(),
        profile.map(|p| p.horizon_url),
    )?;
    let rpc = pick(
        "soroban_rpc_url",
        config.soroban_rpc_url.as_deref(),
        profile.map(|p| p.soroban_rpc_url),
    )?;
    let passphrase = pick(
        "network_passphrase",
        config.network_passphrase.as_deref(),
        profile.map(|p| p.network_passphrase),
    )?;
    let contract = pick(
        "contract_id",
        config.contract_id.as_deref(),
        profile.and_then(|p| p.default_contract_id),
    )?;

    check_no_mixing(profile, &name, "horizon_url", &horizon)?;
    check_no_mixing(profile, &name, "soroban_rpc_url", &rpc)?;

    if let Some(p) = profile {
        if passphrase != p.network_passphrase {
            return Err(EnvironmentError::MixedProfiles {
                field: "network_passphrase",
                value: passphrase,
                owner: owner_of_passphrase(config.network_passphrase.as_deref()),
                selected: name,
            });
        }
    } else if let Some(owner) = profiles::BUILTIN
        .into_iter()
        .find(|p| p.network_passphrase == passphrase)
    {
        // A custom network reusing a built-in passphrase would sign
        // transactions that are valid on that built-in network.
        return Err(EnvironmentError::MixedProfiles {
            field: "network_passphrase",
            value: passphrase,
            owner: owner.name,
            selected: name,
        });
    }

    Ok(NetworkEnvironment {
        network_id,
        ledger_endpoint_url: parse_url("horizon_url", &horizon)?,
        contract_rpc_url: parse_url("soroban_rpc_url", &rpc)?,
        network_passphrase: passphrase,
        contract_id: ContractAddress::parse(&contract).map_err(EnvironmentError::InvalidContract)?,
    })
}

/// Reject an extra endpoint that belongs to a different built-in network
/// than `network_id`.
pub fn check_endpoint_network(
    network_id: &NetworkId,
    field: &'static str,
    url: &str,
) -> Result<(), EnvironmentError> {
    let selected = profiles::lookup(network_id.as_str());
    check_no_mixing(selected, network_id.as_str(), field, url)
}

fn pick(
    field: &'static str,
    explicit: Option<&str>,
    fallback: Option<&'static str>,
) -> Result<String, EnvironmentError> {
    explicit
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or(fallback)
        .map(str::to_string)
        .ok_or(EnvironmentError::MissingField(field))
}

fn check_no_mixing(
    selected: Option<NetworkProfile>,
    selected_name: &str,
    field: &'static str,
    value: &str,
) -> Result<(), EnvironmentError> {
    match profiles::owner_of_url(value) {
        Some(owner) if selected.map(|s| s.name) != Some(owner.name) => {
            Err(EnvironmentError::MixedProfiles {
                field,
                value: value.to_string(),
                owner: owner.name,
                selected: selected_name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn owner_of_passphrase(passphrase: Option<&str>) -> &'static str {
    passphrase
        .and_then(|pp| profiles::BUILTIN.into_iter().find(|p| p.network_passphrase == pp))
        .map(|p| p.name)
        .unwrap_or("custom")
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, EnvironmentError> {
    let url = Url::parse(raw).map_err(|e| EnvironmentError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(EnvironmentError::InvalidUrl {
            field,
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
