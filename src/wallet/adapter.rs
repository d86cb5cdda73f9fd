//! Uniform wallet capability interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::network::NetworkContext;
use crate::primitives::{PublicKey, SignedPayload, UnsignedPayload};
use crate::wallet::agent::{AgentBridge, AgentFault};

/// Supported signing agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletKind {
    Freighter,
    XBull,
    Albedo,
}

impl WalletKind {
    pub const ALL: [WalletKind; 3] = [WalletKind::Freighter, WalletKind::XBull, WalletKind::Albedo];

    pub fn as_str(self) -> &'static str {
        match self {
            WalletKind::Freighter => "freighter",
            WalletKind::XBull => "xbull",
            WalletKind::Albedo => "albedo",
        }
    }

    /// Name under which the host runtime exposes the agent.
    pub fn global_name(self) -> &'static str {
        match self {
            WalletKind::Freighter => "freighter",
            WalletKind::XBull => "xBull",
            WalletKind::Albedo => "Albedo",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletKind {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| WalletError::UnknownKind(s.to_string()))
    }
}

/// Classified wallet failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// The agent is not present in the runtime.
    #[error("{0} wallet not found, install the extension and reload")]
    WalletUnavailable(WalletKind),

    /// The user declined the authorization request.
    #[error("user declined the {0} connection request")]
    UserRejected(WalletKind),

    /// No completed `connect` for this adapter.
    #[error("wallet is not connected")]
    NotConnected,

    /// The user declined to sign.
    #[error("user declined to sign the transaction")]
    SigningRejected,

    /// The agent failed while signing.
    #[error("signing failed: {0}")]
    SigningError(String),

    /// Any other agent-reported failure.
    #[error("wallet error: {0}")]
    Agent(String),

    #[error("unknown wallet kind '{0}'")]
    UnknownKind(String),
}

pub type WalletResult<T> = Result<T, WalletError>;

/// Capability set every wallet kind implements.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    fn kind(&self) -> WalletKind;

    /// Ask the agent to authorize this application; returns the account key.
    async fn connect(&self) -> WalletResult<PublicKey>;

    /// Key authorized by the last successful `connect`.
    async fn public_key(&self) -> WalletResult<PublicKey>;

    /// Have the agent sign `payload` for the given network.
    async fn sign_transaction(
        &self,
        payload: &UnsignedPayload,
        network: &NetworkContext,
    ) -> WalletResult<SignedPayload>;

    /// Best effort; agents without an explicit disconnect only clear local state.
    async fn disconnect(&self) -> WalletResult<()>;

    fn is_connected(&self) -> bool;
}

/// Step at which an agent fault occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Connect,
    Sign,
    Other,
}

/// Map an agent fault onto the wallet error kinds.
///
/// Every adapter shares one notion of user refusal, see
/// [`AgentFault::is_user_rejection`].
pub(crate) fn classify(kind: WalletKind, phase: Phase, fault: &AgentFault) -> WalletError {
    match (phase, fault.is_user_rejection()) {
        (Phase::Connect, true) => WalletError::UserRejected(kind),
        (Phase::Sign, true) => WalletError::SigningRejected,
        (Phase::Sign, false) => WalletError::SigningError(fault.message.clone()),
        _ => WalletError::Agent(fault.message.clone()),
    }
}

/// Authorized key plus the agent handle captured during `connect`.
#[derive(Default)]
pub(crate) struct AgentLink {
    inner: Mutex<Option<(PublicKey, Arc<dyn AgentBridge>)>>,
}

impl AgentLink {
    pub(crate) fn set(&self, key: PublicKey, bridge: Arc<dyn AgentBridge>) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Some((key, bridge));
    }

    pub(crate) fn clear(&self) -> Option<Arc<dyn AgentBridge>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|(_, bridge)| bridge)
    }

    pub(crate) fn get(&self) -> WalletResult<(PublicKey, Arc<dyn AgentBridge>)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(WalletError::NotConnected)
    }

    pub(crate) fn is_set(&self) -> bool {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

/// Parse a key string returned by an agent.
pub(crate) fn agent_key(kind: WalletKind, raw: Option<&str>) -> WalletResult<PublicKey> {
    let raw = raw.ok_or_else(|| WalletError::Agent(format!("{} returned no public key", kind)))?;
    PublicKey::parse(raw).map_err(|e| WalletError::Agent(format!("{} returned an invalid key: {}", kind, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("freighter".parse::<WalletKind>().unwrap(), WalletKind::Freighter);
        assert_eq!(" XBull ".parse::<WalletKind>().unwrap(), WalletKind::XBull);
        assert!(matches!("rabet".parse::<WalletKind>(), Err(WalletError::UnknownKind(_))));
        assert_eq!(WalletKind::XBull.global_name(), "xBull");
        assert_eq!(serde_json::to_string(&WalletKind::XBull).unwrap(), "\"xbull\"");
    }

    #[test]
    fn test_classification() {
        let kind = WalletKind::Albedo;
        let declined = AgentFault::with_code(AgentFault::USER_DECLINED, "boom");
        assert_eq!(classify(kind, Phase::Connect, &declined), WalletError::UserRejected(kind));
        assert_eq!(classify(kind, Phase::Sign, &declined), WalletError::SigningRejected);

        let fault = AgentFault::new("boom");
        assert_eq!(classify(kind, Phase::Sign, &fault), WalletError::SigningError("boom".into()));
        assert_eq!(classify(kind, Phase::Connect, &fault), WalletError::Agent("boom".into()));
    }

    #[test]
    fn test_rejection_by_code_or_wording() {
        for fault in [
            AgentFault::with_code(-4, "boom"),
            AgentFault::new("User declined access"),
            AgentFault::new("Request REJECTED by user"),
            AgentFault::with_code(-1, "Permission denied"),
            AgentFault::new("The user cancelled the action"),
        ] {
            assert!(fault.is_user_rejection(), "{:?}", fault);
        }
        assert!(!AgentFault::with_code(-1, "internal error").is_user_rejection());
    }

    #[test]
    fn test_error_display() {
        let err = WalletError::WalletUnavailable(WalletKind::Freighter);
        assert!(err.to_string().contains("freighter wallet not found"));
    }
}
