//! Albedo web signer adapter.
//!
//! Call shapes:
//! - `publicKey({})` → `{ "pubkey": "G..." }`
//! - `tx({ xdr, network, pubkey, submit: false })` → `{ "signed_envelope_xdr": "..." }`
//!
//! Albedo has no session to tear down; `disconnect` is local only. Its
//! `network` parameter takes `testnet`/`public` for the built-in networks
//! and the raw passphrase otherwise.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::network::{NetworkContext, NetworkId};
use crate::primitives::{PublicKey, SignedPayload, UnsignedPayload};
use crate::wallet::adapter::{agent_key, classify, AgentLink, Phase, WalletAdapter, WalletError, WalletKind, WalletResult};
use crate::wallet::agent::{AgentFault, AgentRuntime};

const KIND: WalletKind = WalletKind::Albedo;

#[derive(Deserialize)]
struct PublicKeyResponse {
    pubkey: Option<String>,
}

#[derive(Deserialize)]
struct TxResponse {
    signed_envelope_xdr: Option<String>,
}

pub struct AlbedoAdapter {
    runtime: Arc<dyn AgentRuntime>,
    link: AgentLink,
}

impl AlbedoAdapter {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            link: AgentLink::default(),
        }
    }

    fn fault(phase: Phase, fault: &AgentFault) -> WalletError {
        classify(KIND, phase, fault)
    }

    fn network_param(network: &NetworkContext) -> &str {
        match network.network_id {
            NetworkId::Custom => network.network_passphrase.as_str(),
            _ => network.network_id.as_str(),
        }
    }
}

#[async_trait]
impl WalletAdapter for AlbedoAdapter {
    fn kind(&self) -> WalletKind {
        KIND
    }

    async fn connect(&self) -> WalletResult<PublicKey> {
        let bridge = self
            .runtime
            .global(KIND.global_name())
            .ok_or(WalletError::WalletUnavailable(KIND))?;

        let raw = bridge
            .call("publicKey", json!({}))
            .await
            .map_err(|f| Self::fault(Phase::Connect, &f))?;
        let response: PublicKeyResponse = serde_json::from_value(raw)
            .map_err(|e| WalletError::Agent(format!("unexpected publicKey response: {}", e)))?;

        let key = agent_key(KIND, response.pubkey.as_deref())?;
        self.link.set(key.clone(), bridge);
        Ok(key)
    }

    async fn public_key(&self) -> WalletResult<PublicKey> {
        self.link.get().map(|(key, _)| key)
    }

    async fn sign_transaction(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> WalletResult<SignedPayload> {
        let (key, bridge) = self.link.get()?;
        let params = json!({
            "xdr": payload.as_xdr(),
            "network": Self::network_param(network),
            "pubkey": key.as_str(),
            "submit": false,
        });

        let raw = bridge
            .call("tx", params)
            .await
            .map_err(|f| Self::fault(Phase::Sign, &f))?;
        let response: TxResponse = serde_json::from_value(raw)
            .map_err(|e| WalletError::SigningError(format!("unexpected tx response: {}", e)))?;

        match response.signed_envelope_xdr {
            Some(xdr) if !xdr.trim().is_empty() => Ok(SignedPayload::new(xdr)),
            _ => Err(WalletError::SigningError("albedo returned no envelope".to_string())),
        }
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.link.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_set()
    }
}
