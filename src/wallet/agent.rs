//! Boundary to the host-provided wallet agents.
//!
//! A host (browser bridge, desktop shell, test harness) exposes each agent
//! as a named global with a JSON method-call surface. Absence of the global
//! is how "extension not installed" shows up.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[error("{message}")]
pub struct AgentFault {
    /// Agent-specific numeric code, when the agent reports one.
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

impl AgentFault {
    /// Code agents use for "user declined".
    pub const USER_DECLINED: i64 = -4;

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    pub(crate) fn message_mentions(&self, needles: &[&str]) -> bool {
        let message = self.message.to_lowercase();
        needles.iter().any(|n| message.contains(n))
    }

    /// The user refused the request, by code or by wording.
    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(Self::USER_DECLINED) || self.message_mentions(&["declined", "rejected", "denied", "cancel"])
    }
}

/// One agent global.
#[async_trait]
pub trait AgentBridge: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, AgentFault>;
}

/// Lookup of agent globals by name.
pub trait AgentRuntime: Send + Sync {
    fn global(&self, name: &str) -> Option<Arc<dyn AgentBridge>>;
}

/// Runtime whose globals are installed in-process by the host.
#[derive(Clone, Default)]
pub struct InProcessRuntime {
    globals: Arc<DashMap<String, Arc<dyn AgentBridge>>>,
}

impl InProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, name: &str, bridge: Arc<dyn AgentBridge>) {
        tracing::debug!(global = name, "Wallet agent installed");
        self.globals.insert(name.to_string(), bridge);
    }

    pub fn remove(&self, name: &str) -> bool {
        self.globals.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.globals.iter().map(|e| e.key().clone()).collect()
    }
}

impl AgentRuntime for InProcessRuntime {
    fn global(&self, name: &str) -> Option<Arc<dyn AgentBridge>> {
        self.globals.get(name).map(|e| e.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl AgentBridge for Echo {
        async fn call(&self, method: &str, params: Value) -> Result<Value, AgentFault> {
            Ok(serde_json::json!({ "method": method, "params": params }))
        }
    }

    #[tokio::test]
    async fn test_in_process_runtime() {
        let runtime = InProcessRuntime::new();
        assert!(runtime.global("freighter").is_none());

        runtime.install("freighter", Arc::new(Echo));
        let bridge = runtime.global("freighter").unwrap();
        let out = bridge.call("ping", Value::Null).await.unwrap();
        assert_eq!(out["method"], "ping");

        assert!(runtime.remove("freighter"));
        assert!(runtime.global("freighter").is_none());
    }

    #[test]
    fn test_fault_deserialize() {
        let fault: AgentFault = serde_json::from_str(r#"{"code": -4, "message": "User declined access"}"#).unwrap();
        assert_eq!(fault.code, Some(AgentFault::USER_DECLINED));
        assert!(fault.message_mentions(&["declined"]));

        let fault: AgentFault = serde_json::from_str(r#"{"message": "oops"}"#).unwrap();
        assert_eq!(fault.code, None);
    }
}
