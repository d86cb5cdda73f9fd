//! Registry mapping wallet kinds to adapters.

use dashmap::DashMap;
use std::sync::Arc;

use crate::wallet::adapter::{WalletAdapter, WalletError, WalletKind, WalletResult};
use crate::wallet::agent::AgentRuntime;
use crate::wallet::{AlbedoAdapter, FreighterAdapter, XBullAdapter};

/// Adapters available to the session layer, keyed by kind.
#[derive(Clone, Default)]
pub struct WalletRegistry {
    adapters: Arc<DashMap<WalletKind, Arc<dyn WalletAdapter>>>,
}

impl WalletRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapter for each enabled kind.
    pub fn with_builtin(runtime: Arc<dyn AgentRuntime>, enabled: &[WalletKind]) -> Self {
        let registry = Self::new();
        for kind in enabled {
            let adapter: Arc<dyn WalletAdapter> = match kind {
                WalletKind::Freighter => Arc::new(FreighterAdapter::new(runtime.clone())),
                WalletKind::XBull => Arc::new(XBullAdapter::new(runtime.clone())),
                WalletKind::Albedo => Arc::new(AlbedoAdapter::new(runtime.clone())),
            };
            registry.register(adapter);
        }
        registry
    }

    /// Register (or replace) the adapter for its kind.
    pub fn register(&self, adapter: Arc<dyn WalletAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: WalletKind) -> WalletResult<Arc<dyn WalletAdapter>> {
        self.adapters
            .get(&kind)
            .map(|e| e.value().clone())
            .ok_or_else(|| WalletError::UnknownKind(kind.to_string()))
    }

    /// Registered kinds in a stable order.
    pub fn kinds(&self) -> Vec<WalletKind> {
        WalletKind::ALL
            .into_iter()
            .filter(|k| self.adapters.contains_key(k))
            .collect()
    }
}
