//! Freighter browser extension adapter.
//!
//! Call shapes:
//! - `requestAccess()` → `{ "address": "G..." }`
//! - `signTransaction({ xdr, networkPassphrase, address })` → `{ "signedTxXdr": "..." }`
//!
//! Freighter has no explicit disconnect; revoking access happens in the
//! extension UI, so `disconnect` only forgets the local authorization.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::network::NetworkContext;
use crate::primitives::{PublicKey, SignedPayload, UnsignedPayload};
use crate::wallet::adapter::{agent_key, classify, AgentLink, Phase, WalletAdapter, WalletError, WalletKind, WalletResult};
use crate::wallet::agent::{AgentFault, AgentRuntime};

const KIND: WalletKind = WalletKind::Freighter;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessResponse {
    address: Option<String>,
    error: Option<AgentFault>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    signed_tx_xdr: Option<String>,
    error: Option<AgentFault>,
}

pub struct FreighterAdapter {
    runtime: Arc<dyn AgentRuntime>,
    link: AgentLink,
}

impl FreighterAdapter {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            link: AgentLink::default(),
        }
    }

    fn fault(phase: Phase, fault: &AgentFault) -> WalletError {
        classify(KIND, phase, fault)
    }
}

#[async_trait]
impl WalletAdapter for FreighterAdapter {
    fn kind(&self) -> WalletKind {
        KIND
    }

    async fn connect(&self) -> WalletResult<PublicKey> {
        let bridge = self
            .runtime
            .global(KIND.global_name())
            .ok_or(WalletError::WalletUnavailable(KIND))?;

        let raw = bridge
            .call("requestAccess", json!({}))
            .await
            .map_err(|f| Self::fault(Phase::Connect, &f))?;
        let response: AccessResponse = serde_json::from_value(raw)
            .map_err(|e| WalletError::Agent(format!("unexpected requestAccess response: {}", e)))?;
        // Freighter reports some failures in-band instead of rejecting.
        if let Some(fault) = response.error {
            return Err(Self::fault(Phase::Connect, &fault));
        }

        let key = agent_key(KIND, response.address.as_deref())?;
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
            "networkPassphrase": network.network_passphrase,
            "address": key.as_str(),
        });

        let raw = bridge
            .call("signTransaction", params)
            .await
            .map_err(|f| Self::fault(Phase::Sign, &f))?;
        let response: SignResponse = serde_json::from_value(raw)
            .map_err(|e| WalletError::SigningError(format!("unexpected signTransaction response: {}", e)))?;
        if let Some(fault) = response.error {
            return Err(Self::fault(Phase::Sign, &fault));
        }

        match response.signed_tx_xdr {
            Some(xdr) if !xdr.trim().is_empty() => Ok(SignedPayload::new(xdr)),
            _ => Err(WalletError::SigningError("freighter returned an empty envelope".to_string())),
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
