//! Confirmation polling.
//!
//! Polls `transaction_status` at a fixed interval until a terminal status
//! is seen, the deadline passes, or the cancel signal fires. The first
//! poll is immediate.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::ledger::client::LedgerApi;
use crate::ledger::types::TransactionStatus;
use crate::observability::metrics;
use crate::primitives::TxHash;

/// How a confirmation wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Successful,
    Failed,
    /// Still pending at the deadline. The transaction may yet apply.
    TimedOut,
    /// Stopped by the cancel signal. Outcome unknown.
    Cancelled,
}

impl ConfirmationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Wait for `hash` to reach a terminal status.
///
/// Transport errors on a single tick are logged and treated as pending;
/// the overall deadline still bounds the wait. Polling stops as soon as
/// `cancel` completes; pass `std::future::pending()` for no cancellation.
pub async fn wait_for_confirmation<C>(
    ledger: &dyn LedgerApi,
    hash: &TxHash,
    poll_interval: Duration,
    deadline: Duration,
    cancel: C,
) -> ConfirmationOutcome
where
    C: Future<Output = ()>,
{
    let poll_loop = async {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls = 0u32;

        loop {
            ticker.tick().await;
            polls += 1;
            metrics::record_confirmation_poll();

            match ledger.transaction_status(hash).await {
                Ok(TransactionStatus::Successful) => return ConfirmationOutcome::Successful,
                Ok(TransactionStatus::Failed) => return ConfirmationOutcome::Failed,
                Ok(TransactionStatus::Pending) => {
                    tracing::debug!(tx_hash = %hash, polls, "Transaction pending");
                }
                Err(e) => {
                    tracing::warn!(tx_hash = %hash, polls, error = %e, "Status poll failed, still waiting");
                }
            }
        }
    };

    let bounded = async {
        match timeout(deadline, poll_loop).await {
            Ok(outcome) => outcome,
            Err(_) => ConfirmationOutcome::TimedOut,
        }
    };

    // Cancellation wins over a tick that is ready at the same instant.
    tokio::select! {
        biased;
        _ = cancel => {
            tracing::info!(tx_hash = %hash, "Confirmation polling cancelled");
            ConfirmationOutcome::Cancelled
        }
        outcome = bounded => outcome,
    }
}
