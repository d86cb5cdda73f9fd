//! Process-wide wallet session record.
//!
//! # Responsibilities
//! - Connect through the wallet registry; at most one active session
//! - Tear down the previous session (and its in-flight work) on replace
//! - Publish snapshots for observers
//! - Hand out one attempt lease per account at a time, across sessions

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::observability::metrics;
use crate::primitives::PublicKey;
use crate::session::teardown::{Teardown, TeardownListener, TeardownReason};
use crate::wallet::{WalletAdapter, WalletError, WalletKind, WalletRegistry, WalletResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// The active wallet and its authorized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSession {
    pub wallet_kind: WalletKind,
    pub public_key: PublicKey,
    pub connection_status: ConnectionStatus,
}

/// What observers see on every session change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub status: ConnectionStatus,
    pub wallet_kind: Option<WalletKind>,
    pub public_key: Option<PublicKey>,
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    fn disconnected() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            wallet_kind: None,
            public_key: None,
            last_error: None,
        }
    }
}

/// Why an attempt could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseError {
    NotConnected,
    AttemptInProgress,
}

struct ActiveSession {
    id: u64,
    kind: WalletKind,
    public_key: PublicKey,
    adapter: Arc<dyn WalletAdapter>,
    teardown: Arc<Teardown>,
}

/// Accounts with an attempt in flight, mapped to the session that started it.
type InFlight = Arc<DashMap<PublicKey, u64>>;

/// Exclusive right to run one attempt for the session's account.
///
/// Outlives the session it came from: a replaced session's attempt that is
/// already submitting keeps the account claimed until it finishes. Released
/// on drop.
pub struct AttemptLease {
    pub session_id: u64,
    pub wallet_kind: WalletKind,
    pub public_key: PublicKey,
    pub adapter: Arc<dyn WalletAdapter>,
    pub teardown: TeardownListener,
    in_flight: InFlight,
}

impl Drop for AttemptLease {
    fn drop(&mut self) {
        self.in_flight.remove(&self.public_key);
    }
}

/// Single source of truth for the active wallet session.
pub struct SessionState {
    registry: WalletRegistry,
    active: Mutex<Option<ActiveSession>>,
    snapshot: watch::Sender<SessionSnapshot>,
    next_id: AtomicU64,
    in_flight: InFlight,
    /// Serializes connect/disconnect so replacement is atomic.
    transitions: tokio::sync::Mutex<()>,
}

impl SessionState {
    pub fn new(registry: WalletRegistry) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::disconnected());
        Self {
            registry,
            active: Mutex::new(None),
            snapshot,
            next_id: AtomicU64::new(1),
            in_flight: Arc::new(DashMap::new()),
            transitions: tokio::sync::Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &WalletRegistry {
        &self.registry
    }

    /// Connect `kind`, replacing any active session.
    pub async fn connect(&self, kind: WalletKind) -> WalletResult<WalletSession> {
        let _serial = self.transitions.lock().await;

        self.end_active(TeardownReason::Replaced).await;

        let adapter = match self.registry.get(kind) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.publish_error(kind, &e);
                return Err(e);
            }
        };

        self.snapshot.send_replace(SessionSnapshot {
            status: ConnectionStatus::Connecting,
            wallet_kind: Some(kind),
            public_key: None,
            last_error: None,
        });
        tracing::info!(wallet = %kind, "Connecting wallet");

        let public_key = match adapter.connect().await {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(wallet = %kind, error = %e, "Wallet connection failed");
                self.publish_error(kind, &e);
                return Err(e);
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.lock_active() = Some(ActiveSession {
            id,
            kind,
            public_key: public_key.clone(),
            adapter,
            teardown: Arc::new(Teardown::new()),
        });

        self.snapshot.send_replace(SessionSnapshot {
            status: ConnectionStatus::Connected,
            wallet_kind: Some(kind),
            public_key: Some(public_key.clone()),
            last_error: None,
        });
        metrics::record_wallet_connected(true);
        tracing::info!(wallet = %kind, public_key = %public_key.abbreviated(), session_id = id, "Wallet connected");

        Ok(WalletSession {
            wallet_kind: kind,
            public_key,
            connection_status: ConnectionStatus::Connected,
        })
    }

    /// Disconnect the active session, if any.
    pub async fn disconnect(&self) {
        self.teardown(TeardownReason::Disconnected).await;
    }

    /// End the active session for `reason`, stopping its in-flight work.
    pub async fn teardown(&self, reason: TeardownReason) {
        let _serial = self.transitions.lock().await;
        self.end_active(reason).await;
        // Also clears a status left at `Error` by a failed connect.
        self.snapshot.send_if_modified(|snapshot| {
            if snapshot.status == ConnectionStatus::Disconnected {
                return false;
            }
            *snapshot = SessionSnapshot::disconnected();
            true
        });
    }

    pub fn current_session(&self) -> Option<WalletSession> {
        self.lock_active().as_ref().map(|s| WalletSession {
            wallet_kind: s.kind,
            public_key: s.public_key.clone(),
            connection_status: ConnectionStatus::Connected,
        })
    }

    pub fn status(&self) -> ConnectionStatus {
        self.snapshot.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Claim the active session's account for one attempt.
    pub fn begin_attempt(&self) -> Result<AttemptLease, LeaseError> {
        let guard = self.lock_active();
        let session = guard.as_ref().ok_or(LeaseError::NotConnected)?;

        match self.in_flight.entry(session.public_key.clone()) {
            Entry::Occupied(holder) => {
                tracing::debug!(
                    public_key = %session.public_key.abbreviated(),
                    holder_session = *holder.get(),
                    session_id = session.id,
                    "Account already has an attempt in flight"
                );
                return Err(LeaseError::AttemptInProgress);
            }
            Entry::Vacant(slot) => {
                slot.insert(session.id);
            }
        }

        Ok(AttemptLease {
            session_id: session.id,
            wallet_kind: session.kind,
            public_key: session.public_key.clone(),
            adapter: session.adapter.clone(),
            teardown: session.teardown.listener(),
            in_flight: self.in_flight.clone(),
        })
    }

    /// Remove the active session, signal teardown and disconnect its adapter.
    async fn end_active(&self, reason: TeardownReason) {
        let Some(previous) = self.lock_active().take() else {
            return;
        };

        previous.teardown.trigger(reason);
        if let Err(e) = previous.adapter.disconnect().await {
            tracing::warn!(wallet = %previous.kind, error = %e, "Wallet disconnect failed");
        }
        metrics::record_wallet_connected(false);
        tracing::info!(
            wallet = %previous.kind,
            session_id = previous.id,
            reason = ?reason,
            "Wallet session ended"
        );
    }

    fn publish_error(&self, kind: WalletKind, error: &WalletError) {
        self.snapshot.send_replace(SessionSnapshot {
            status: ConnectionStatus::Error,
            wallet_kind: Some(kind),
            public_key: None,
            last_error: Some(error.to_string()),
        });
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkContext;
    use crate::primitives::{SignedPayload, UnsignedPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32};

    const ACCOUNT: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    struct StubAdapter {
        kind: WalletKind,
        reject: bool,
        connected: AtomicBool,
        disconnects: AtomicU32,
    }

    impl StubAdapter {
        fn new(kind: WalletKind, reject: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                reject,
                connected: AtomicBool::new(false),
                disconnects: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl WalletAdapter for StubAdapter {
        fn kind(&self) -> WalletKind {
            self.kind
        }

        async fn connect(&self) -> WalletResult<PublicKey> {
            if self.reject {
                return Err(WalletError::UserRejected(self.kind));
            }
            self.connected.store(true, Ordering::SeqCst);
            Ok(PublicKey::parse(ACCOUNT).unwrap())
        }

        async fn public_key(&self) -> WalletResult<PublicKey> {
            Ok(PublicKey::parse(ACCOUNT).unwrap())
        }

        async fn sign_transaction(
            &self,
            payload: &UnsignedPayload,
            _network: &NetworkContext,
        ) -> WalletResult<SignedPayload> {
            Ok(SignedPayload::new(payload.as_xdr()))
        }

        async fn disconnect(&self) -> WalletResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    fn state_with(adapters: &[Arc<StubAdapter>]) -> SessionState {
        let registry = WalletRegistry::new();
        for a in adapters {
            registry.register(a.clone());
        }
        SessionState::new(registry)
    }

    #[tokio::test]
    async fn test_connect_and_disconnect() {
        let freighter = StubAdapter::new(WalletKind::Freighter, false);
        let state = state_with(&[freighter.clone()]);
        let mut snapshots = state.subscribe();

        let session = state.connect(WalletKind::Freighter).await.unwrap();
        assert_eq!(session.public_key.as_str(), ACCOUNT);
        assert_eq!(state.status(), ConnectionStatus::Connected);
        assert!(snapshots.has_changed().unwrap());
        assert_eq!(snapshots.borrow_and_update().wallet_kind, Some(WalletKind::Freighter));

        state.disconnect().await;
        assert!(state.current_session().is_none());
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert_eq!(freighter.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_connect_replaces_session() {
        let freighter = StubAdapter::new(WalletKind::Freighter, false);
        let albedo = StubAdapter::new(WalletKind::Albedo, false);
        let state = state_with(&[freighter.clone(), albedo.clone()]);

        state.connect(WalletKind::Freighter).await.unwrap();
        let mut lease = state.begin_attempt().unwrap();

        state.connect(WalletKind::Albedo).await.unwrap();
        assert_eq!(lease.teardown.wait().await, TeardownReason::Replaced);
        assert_eq!(freighter.disconnects.load(Ordering::SeqCst), 1);
        assert_eq!(state.current_session().unwrap().wallet_kind, WalletKind::Albedo);

        // Same account: the old attempt keeps it claimed until it finishes.
        assert_eq!(state.begin_attempt().err(), Some(LeaseError::AttemptInProgress));
        drop(lease);
        assert!(state.begin_attempt().is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_clears_error_status() {
        let xbull = StubAdapter::new(WalletKind::XBull, true);
        let state = state_with(&[xbull]);
        let mut snapshots = state.subscribe();

        state.connect(WalletKind::XBull).await.unwrap_err();
        assert_eq!(state.status(), ConnectionStatus::Error);
        snapshots.borrow_and_update();

        state.disconnect().await;
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
        assert!(state.subscribe().borrow().last_error.is_none());
        assert!(snapshots.has_changed().unwrap());

        // Already disconnected: observers are not woken again.
        snapshots.borrow_and_update();
        state.disconnect().await;
        assert!(!snapshots.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_rejected_connect_sets_error() {
        let xbull = StubAdapter::new(WalletKind::XBull, true);
        let state = state_with(&[xbull]);

        let err = state.connect(WalletKind::XBull).await.unwrap_err();
        assert_eq!(err, WalletError::UserRejected(WalletKind::XBull));
        assert_eq!(state.status(), ConnectionStatus::Error);
        assert!(state.current_session().is_none());
        assert!(state.subscribe().borrow().last_error.is_some());
    }

    #[tokio::test]
    async fn test_unregistered_kind_fails() {
        let state = state_with(&[]);
        let err = state.connect(WalletKind::Freighter).await.unwrap_err();
        assert_eq!(err, WalletError::UnknownKind("freighter".into()));
        assert_eq!(state.status(), ConnectionStatus::Error);
    }

    #[tokio::test]
    async fn test_one_lease_per_session() {
        let freighter = StubAdapter::new(WalletKind::Freighter, false);
        let state = state_with(&[freighter]);

        assert_eq!(state.begin_attempt().err(), Some(LeaseError::NotConnected));

        state.connect(WalletKind::Freighter).await.unwrap();
        let lease = state.begin_attempt().unwrap();
        assert_eq!(state.begin_attempt().err(), Some(LeaseError::AttemptInProgress));

        drop(lease);
        assert!(state.begin_attempt().is_ok());
    }
}
