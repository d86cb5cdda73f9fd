//! Drives one attempt from request to terminal outcome.
//!
//! # Steps
//! 1. Claim the signing account (one attempt at a time) and validate input locally
//! 2. Build the contract invocation for the session key
//! 3. Ask the session's wallet to sign for the environment's network
//! 4. Submit once; never resubmitted
//! 5. Poll for confirmation until terminal, timeout, or session teardown
//!
//! Every attempt that leaves `Idle` publishes exactly one invalidation.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::amount::{to_minor_units, AmountError, MinorUnits};
use crate::config::ConfirmationConfig;
use crate::contract::ContractClient;
use crate::error::DonationError;
use crate::ledger::{wait_for_confirmation, ConfirmationOutcome, LedgerApi, LedgerError};
use crate::network::NetworkEnvironment;
use crate::observability::metrics;
use crate::orchestrator::attempt::{AttemptKind, AttemptState, TransactionAttempt};
use crate::orchestrator::events::{AttemptOutcome, AttemptProgress, Invalidation, Receipt};
use crate::primitives::{Address, TxHash};
use crate::session::{AttemptLease, LeaseError, SessionState};
use crate::wallet::WalletError;

const INVALIDATION_BUFFER: usize = 64;

/// Network clients an attempt runs against. Swapped as a unit on reconfigure.
pub struct Endpoints {
    pub environment: NetworkEnvironment,
    pub ledger: Arc<dyn LedgerApi>,
    pub contract: ContractClient,
}

/// A user action as received from the caller, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub kind: AttemptKind,
    pub campaign: String,
    /// Display-unit amount, contributions only.
    pub amount: Option<String>,
}

impl ActionRequest {
    pub fn contribute(campaign: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Contribute,
            campaign: campaign.into(),
            amount: Some(amount.into()),
        }
    }

    pub fn refund(campaign: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Refund,
            campaign: campaign.into(),
            amount: None,
        }
    }

    pub fn withdraw(campaign: impl Into<String>) -> Self {
        Self {
            kind: AttemptKind::Withdraw,
            campaign: campaign.into(),
            amount: None,
        }
    }
}

pub struct Orchestrator {
    session: Arc<SessionState>,
    poll_interval: Duration,
    confirmation_timeout: Duration,
    progress: watch::Sender<Option<AttemptProgress>>,
    invalidations: broadcast::Sender<Invalidation>,
}

impl Orchestrator {
    pub fn new(session: Arc<SessionState>, confirmation: &ConfirmationConfig) -> Self {
        let (progress, _) = watch::channel(None);
        let (invalidations, _) = broadcast::channel(INVALIDATION_BUFFER);
        Self {
            session,
            poll_interval: confirmation.poll_interval(),
            confirmation_timeout: confirmation.timeout(),
            progress,
            invalidations,
        }
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<Option<AttemptProgress>> {
        self.progress.subscribe()
    }

    pub fn subscribe_invalidations(&self) -> broadcast::Receiver<Invalidation> {
        self.invalidations.subscribe()
    }

    /// Run one attempt to completion.
    pub async fn run(&self, endpoints: &Endpoints, request: ActionRequest) -> Result<Receipt, DonationError> {
        let mut lease = match self.session.begin_attempt() {
            Ok(lease) => lease,
            Err(LeaseError::NotConnected) => {
                tracing::info!(kind = %request.kind, "Attempt refused, no wallet connected");
                return Err(DonationError::NotConnected);
            }
            Err(LeaseError::AttemptInProgress) => {
                tracing::info!(kind = %request.kind, "Attempt refused, another is in flight");
                return Err(DonationError::AttemptInProgress);
            }
        };

        let (campaign, amount) = match validate(&request) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::info!(kind = %request.kind, error = %e, "Attempt rejected by local validation");
                return Err(e);
            }
        };

        let mut attempt = TransactionAttempt::new(request.kind, campaign, amount);
        tracing::info!(
            attempt_id = %attempt.id(),
            kind = %attempt.kind(),
            campaign = %attempt.campaign(),
            wallet = %lease.wallet_kind,
            "Attempt started"
        );

        let result = self.drive(endpoints, &mut attempt, &mut lease).await;
        self.finish(&mut attempt, result)
    }

    async fn drive(
        &self,
        endpoints: &Endpoints,
        attempt: &mut TransactionAttempt,
        lease: &mut AttemptLease,
    ) -> Result<TxHash, DonationError> {
        self.transition(attempt, AttemptState::BuildingInvocation);
        let contract = &endpoints.contract;
        let built = match (attempt.kind(), attempt.amount()) {
            (AttemptKind::Contribute, Some(amount)) => {
                contract.contribute(&lease.public_key, attempt.campaign(), amount).await
            }
            (AttemptKind::Contribute, None) => return Err(AmountError::Empty.into()),
            (AttemptKind::Refund, _) => contract.refund(&lease.public_key, attempt.campaign()).await,
            (AttemptKind::Withdraw, _) => contract.withdraw(&lease.public_key).await,
        };
        let unsigned = built?;
        attempt.set_unsigned(unsigned.clone());

        self.transition(attempt, AttemptState::AwaitingSignature);
        let network = endpoints.environment.context();
        let signed = tokio::select! {
            biased;
            reason = lease.teardown.wait() => {
                return Err(DonationError::UserCancelled(format!(
                    "wallet session ended ({:?}) before the transaction was signed",
                    reason
                )));
            }
            signed = lease.adapter.sign_transaction(&unsigned, &network) => signed.map_err(signing_failure)?,
        };
        if signed.is_empty() {
            return Err(WalletError::SigningError("wallet returned an empty payload".into()).into());
        }
        attempt.set_signed(signed.clone());

        self.transition(attempt, AttemptState::Submitting);
        let hash = endpoints.ledger.submit(&signed).await.map_err(|e| match e {
            // The request went out; an unreadable answer does not mean it was dropped.
            LedgerError::Protocol(message) => DonationError::NetworkUnavailable {
                message,
                maybe_submitted: true,
            },
            other => other.into(),
        })?;
        attempt.set_hash(hash.clone());

        self.transition(attempt, AttemptState::Confirming);
        let teardown = &mut lease.teardown;
        let outcome = wait_for_confirmation(
            endpoints.ledger.as_ref(),
            &hash,
            self.poll_interval,
            self.confirmation_timeout,
            async move {
                teardown.wait().await;
            },
        )
        .await;

        match outcome {
            ConfirmationOutcome::Successful => Ok(hash),
            ConfirmationOutcome::Failed => Err(DonationError::TransactionFailed { hash }),
            ConfirmationOutcome::TimedOut => Err(DonationError::ConfirmationTimeout {
                hash,
                timeout_secs: self.confirmation_timeout.as_secs(),
            }),
            ConfirmationOutcome::Cancelled => Err(DonationError::ConfirmationCancelled { hash }),
        }
    }

    /// Record the terminal state, then notify observers once.
    fn finish(
        &self,
        attempt: &mut TransactionAttempt,
        result: Result<TxHash, DonationError>,
    ) -> Result<Receipt, DonationError> {
        let elapsed = attempt.elapsed();
        let outcome = match &result {
            Ok(hash) => {
                self.transition(attempt, AttemptState::Succeeded);
                tracing::info!(
                    attempt_id = %attempt.id(),
                    kind = %attempt.kind(),
                    tx_hash = %hash,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Attempt succeeded"
                );
                AttemptOutcome::Succeeded
            }
            Err(e) => {
                let kind = e.kind();
                if let Err(violation) = attempt.fail(e.clone()) {
                    tracing::error!(attempt_id = %attempt.id(), error = %violation, "Attempt state machine violated");
                }
                self.publish(attempt);
                if e.is_cancellation() {
                    tracing::info!(attempt_id = %attempt.id(), kind = %attempt.kind(), "Attempt cancelled");
                } else {
                    tracing::warn!(
                        attempt_id = %attempt.id(),
                        kind = %attempt.kind(),
                        error_kind = %kind,
                        error = %e,
                        outcome_unknown = e.outcome_unknown(),
                        "Attempt failed"
                    );
                }
                AttemptOutcome::Failed(kind)
            }
        };

        let outcome_label = match outcome {
            AttemptOutcome::Succeeded => "succeeded",
            AttemptOutcome::Failed(kind) => kind.as_str(),
        };
        metrics::record_attempt(attempt.kind().as_str(), outcome_label, elapsed);

        // No receivers is fine.
        let _ = self.invalidations.send(Invalidation {
            attempt_id: attempt.id(),
            campaign_address: attempt.campaign().clone(),
            kind: attempt.kind(),
            outcome,
        });

        result.map(|hash| Receipt {
            attempt_id: attempt.id(),
            kind: attempt.kind(),
            campaign_address: attempt.campaign().clone(),
            hash,
        })
    }

    fn transition(&self, attempt: &mut TransactionAttempt, next: AttemptState) {
        if let Err(e) = attempt.advance(next) {
            tracing::error!(attempt_id = %attempt.id(), error = %e, "Attempt state machine violated");
            return;
        }
        tracing::debug!(attempt_id = %attempt.id(), state = %next, "Attempt state changed");
        self.publish(attempt);
    }

    fn publish(&self, attempt: &TransactionAttempt) {
        self.progress.send_replace(Some(AttemptProgress {
            attempt_id: attempt.id(),
            kind: attempt.kind(),
            campaign_address: attempt.campaign().clone(),
            state: attempt.state(),
            tx_hash: attempt.hash().cloned(),
        }));
    }
}

/// Local checks that run before anything leaves the process.
fn validate(request: &ActionRequest) -> Result<(Address, Option<MinorUnits>), DonationError> {
    let amount = match request.kind {
        AttemptKind::Contribute => {
            let raw = request.amount.as_deref().ok_or(AmountError::Empty)?;
            Some(to_minor_units(raw)?)
        }
        AttemptKind::Refund | AttemptKind::Withdraw => None,
    };
    let campaign = Address::parse(&request.campaign)?;
    Ok((campaign, amount))
}

fn signing_failure(e: WalletError) -> DonationError {
    match e {
        WalletError::SigningRejected | WalletError::UserRejected(_) => {
            DonationError::UserCancelled("signature request declined".into())
        }
        WalletError::NotConnected => DonationError::NotConnected,
        WalletError::WalletUnavailable(kind) => {
            WalletError::SigningError(format!("{} wallet is no longer available", kind)).into()
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const CAMPAIGN: &str = "CDBWA6QGQZZR5XLFESB7ANVIP5O4IRF56X6VVLCVSE2B6YL7MNWCFKLV";

    #[test]
    fn test_validate_contribution_amount() {
        let (campaign, amount) = validate(&ActionRequest::contribute(CAMPAIGN, "12.5")).unwrap();
        assert_eq!(campaign.as_str(), CAMPAIGN);
        assert_eq!(amount.map(|a| a.get()), Some(125_000_000));

        for bad in ["0", "-1", "abc", ""] {
            let err = validate(&ActionRequest::contribute(CAMPAIGN, bad)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidAmount, "amount {:?}", bad);
        }
    }

    #[test]
    fn test_validate_campaign_address() {
        let err = validate(&ActionRequest::refund("campaign_address_1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArguments);

        let (_, amount) = validate(&ActionRequest::withdraw(CAMPAIGN)).unwrap();
        assert!(amount.is_none());
    }

    #[test]
    fn test_signing_failures_classified() {
        assert_eq!(signing_failure(WalletError::SigningRejected).kind(), ErrorKind::UserCancelled);
        assert_eq!(
            signing_failure(WalletError::SigningError("boom".into())).kind(),
            ErrorKind::WalletError
        );
        assert_eq!(
            signing_failure(WalletError::WalletUnavailable(crate::wallet::WalletKind::Albedo)).kind(),
            ErrorKind::WalletError
        );
        assert_eq!(signing_failure(WalletError::NotConnected).kind(), ErrorKind::NotConnected);
    }
}
