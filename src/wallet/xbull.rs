//! xBull wallet adapter.
//!
//! Call shapes:
//! - `connect({ canRequestPublicKey, canRequestSign })` → `true`
//! - `getPublicKey()` → `"G..."`
//! - `signXDR({ xdr, network, publicKey })` → `"<signed xdr>"`
//! - `disconnect()`

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::network::NetworkContext;
use crate::primitives::{PublicKey, SignedPayload, UnsignedPayload};
use crate::wallet::adapter::{agent_key, classify, AgentLink, Phase, WalletAdapter, WalletError, WalletKind, WalletResult};
use crate::wallet::agent::{AgentFault, AgentRuntime};

const KIND: WalletKind = WalletKind::XBull;

pub struct XBullAdapter {
    runtime: Arc<dyn AgentRuntime>,
    link: AgentLink,
}

impl XBullAdapter {
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
impl WalletAdapter for XBullAdapter {
    fn kind(&self) -> WalletKind {
        KIND
    }

    async fn connect(&self) -> WalletResult<PublicKey> {
        let bridge = self
            .runtime
            .global(KIND.global_name())
            .ok_or(WalletError::WalletUnavailable(KIND))?;

        let granted = bridge
            .call("connect", json!({ "canRequestPublicKey": true, "canRequestSign": true }))
            .await
            .map_err(|f| Self::fault(Phase::Connect, &f))?;
        if granted == Value::Bool(false) {
            return Err(WalletError::UserRejected(KIND));
        }

        let raw = bridge
            .call("getPublicKey", Value::Null)
            .await
            .map_err(|f| Self::fault(Phase::Connect, &f))?;
        let key = agent_key(KIND, raw.as_str())?;

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
            "network": network.network_passphrase,
            "publicKey": key.as_str(),
        });

        let raw = bridge
            .call("signXDR", params)
            .await
            .map_err(|f| Self::fault(Phase::Sign, &f))?;

        match raw.as_str() {
            Some(xdr) if !xdr.trim().is_empty() => Ok(SignedPayload::new(xdr)),
            _ => Err(WalletError::SigningError("xbull returned no envelope".to_string())),
        }
    }

    async fn disconnect(&self) -> WalletResult<()> {
        let Some(bridge) = self.link.clear() else {
            return Ok(());
        };
        bridge
            .call("disconnect", Value::Null)
            .await
            .map(|_| ())
            .map_err(|f| Self::fault(Phase::Other, &f))
    }

    fn is_connected(&self) -> bool {
        self.link.is_set()
    }
}
