//! Session teardown signalling.

use std::sync::OnceLock;
use tokio::sync::broadcast;

/// Why a wallet session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Disconnected,
    /// Another wallet was connected in its place.
    Replaced,
    /// The network environment was swapped.
    Reconfigured,
}

/// One-shot teardown signal owned by a single wallet session.
///
/// Every in-flight step that must stop with the session (signature wait,
/// confirmation polling) holds a listener.
pub struct Teardown {
    tx: broadcast::Sender<TeardownReason>,
    reason: OnceLock<TeardownReason>,
}

impl Teardown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            reason: OnceLock::new(),
        }
    }

    pub fn listener(&self) -> TeardownListener {
        // Subscribe before reading the latch so a concurrent trigger is
        // observed through one or the other.
        let rx = self.tx.subscribe();
        TeardownListener {
            rx,
            fired: self.reason.get().copied(),
        }
    }

    /// Fire the signal. Returns false if it had already fired.
    pub fn trigger(&self, reason: TeardownReason) -> bool {
        if self.reason.set(reason).is_err() {
            return false;
        }
        let _ = self.tx.send(reason);
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.reason.get().is_some()
    }

    /// Listeners still attached.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half of a [`Teardown`].
pub struct TeardownListener {
    rx: broadcast::Receiver<TeardownReason>,
    fired: Option<TeardownReason>,
}

impl TeardownListener {
    /// Resolve once the session is torn down.
    ///
    /// A dropped session counts as disconnected.
    pub async fn wait(&mut self) -> TeardownReason {
        if let Some(reason) = self.fired {
            return reason;
        }
        let reason = self.rx.recv().await.unwrap_or(TeardownReason::Disconnected);
        self.fired = Some(reason);
        reason
    }
}
