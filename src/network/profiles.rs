//! Built-in network profiles.

use url::Url;

/// Connection parameters of a well-known network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: &'static str,
    pub network_passphrase: &'static str,
    pub horizon_url: &'static str,
    pub soroban_rpc_url: &'static str,
    /// Crowdfunding contract deployed on this network, if any.
    pub default_contract_id: Option<&'static str>,
}

pub const TESTNET: NetworkProfile = NetworkProfile {
    name: "testnet",
    network_passphrase: "Test SDF Network ; September 2015",
    horizon_url: "https://horizon-testnet.stellar.org",
    soroban_rpc_url: "https://soroban-testnet.stellar.org",
    default_contract_id: Some("CDBWA6QGQZZR5XLFESB7ANVIP5O4IRF56X6VVLCVSE2B6YL7MNWCFKLV"),
};

pub const PUBLIC: NetworkProfile = NetworkProfile {
    name: "public",
    network_passphrase: "Public Global Stellar Network ; September 2015",
    horizon_url: "https://horizon.stellar.org",
    soroban_rpc_url: "https://soroban.stellar.org",
    default_contract_id: None,
};

pub const BUILTIN: [NetworkProfile; 2] = [TESTNET, PUBLIC];

/// Look up a built-in profile by name (case-insensitive, `mainnet` aliases `public`).
pub fn lookup(name: &str) -> Option<NetworkProfile> {
    match name.trim().to_ascii_lowercase().as_str() {
        "testnet" | "test" => Some(TESTNET),
        "public" | "mainnet" | "pubnet" => Some(PUBLIC),
        _ => None,
    }
}

/// Find the built-in profile that owns an endpoint URL, if any.
///
/// Matches on host alone, so scheme, port, path and case variants of a
/// built-in endpoint still resolve to its network.
pub fn owner_of_url(url: &str) -> Option<NetworkProfile> {
    let url = Url::parse(url.trim()).ok()?;
    let host = url.host_str()?.trim_end_matches('.');
    BUILTIN.into_iter().find(|p| {
        [p.horizon_url, p.soroban_rpc_url]
            .iter()
            .filter_map(|known| Url::parse(known).ok())
            .any(|known| known.host_str() == Some(host))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_ignores_url_spelling() {
        for variant in [
            "https://horizon.stellar.org",
            "https://HORIZON.Stellar.org/",
            "http://horizon.stellar.org:443/accounts",
            "https://horizon.stellar.org./",
        ] {
            assert_eq!(owner_of_url(variant).map(|p| p.name), Some("public"), "{}", variant);
        }
        assert_eq!(
            owner_of_url("https://soroban-testnet.stellar.org:8443/rpc").map(|p| p.name),
            Some("testnet")
        );
    }

    #[test]
    fn test_unknown_hosts_have_no_owner() {
        assert!(owner_of_url("http://localhost:8000").is_none());
        assert!(owner_of_url("https://horizon.example.org").is_none());
        assert!(owner_of_url("not a url").is_none());
    }
}
