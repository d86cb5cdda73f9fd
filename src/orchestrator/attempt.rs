//! Transaction attempt record and its forward-only state machine.

use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::amount::MinorUnits;
use crate::error::{DonationError, ErrorKind};
use crate::primitives::{Address, SignedPayload, TxHash, UnsignedPayload};

/// User action an attempt performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptKind {
    Contribute,
    Refund,
    Withdraw,
}

impl AttemptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contribute => "contribute",
            Self::Refund => "refund",
            Self::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum AttemptState {
    Idle,
    BuildingInvocation,
    AwaitingSignature,
    Submitting,
    Confirming,
    Succeeded,
    Failed(ErrorKind),
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed(_))
    }

    fn successor(self) -> Option<AttemptState> {
        match self {
            Self::Idle => Some(Self::BuildingInvocation),
            Self::BuildingInvocation => Some(Self::AwaitingSignature),
            Self::AwaitingSignature => Some(Self::Submitting),
            Self::Submitting => Some(Self::Confirming),
            Self::Confirming => Some(Self::Succeeded),
            Self::Succeeded | Self::Failed(_) => None,
        }
    }

    /// Forward by one step, or to `Failed` from any non-terminal state.
    pub fn can_advance_to(self, next: AttemptState) -> bool {
        match next {
            Self::Failed(_) => !self.is_terminal(),
            _ => self.successor() == Some(next),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BuildingInvocation => "building_invocation",
            Self::AwaitingSignature => "awaiting_signature",
            Self::Submitting => "submitting",
            Self::Confirming => "confirming",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(kind) => write!(f, "failed({})", kind),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal attempt transition {from} -> {to}")]
pub struct TransitionError {
    pub from: AttemptState,
    pub to: AttemptState,
}

/// One user action from request to terminal outcome. Never persisted.
#[derive(Debug)]
pub struct TransactionAttempt {
    id: Uuid,
    kind: AttemptKind,
    campaign: Address,
    amount: Option<MinorUnits>,
    unsigned: Option<UnsignedPayload>,
    signed: Option<SignedPayload>,
    hash: Option<TxHash>,
    state: AttemptState,
    last_error: Option<DonationError>,
    started: Instant,
}

impl TransactionAttempt {
    pub fn new(kind: AttemptKind, campaign: Address, amount: Option<MinorUnits>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            campaign,
            amount,
            unsigned: None,
            signed: None,
            hash: None,
            state: AttemptState::Idle,
            last_error: None,
            started: Instant::now(),
        }
    }

    pub fn advance(&mut self, next: AttemptState) -> Result<(), TransitionError> {
        if !self.state.can_advance_to(next) {
            return Err(TransitionError {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Move to `Failed`, discarding payloads that can no longer be used.
    pub fn fail(&mut self, error: DonationError) -> Result<(), TransitionError> {
        self.advance(AttemptState::Failed(error.kind()))?;
        self.unsigned = None;
        self.signed = None;
        self.last_error = Some(error);
        Ok(())
    }

    pub fn set_unsigned(&mut self, payload: UnsignedPayload) {
        self.unsigned = Some(payload);
    }

    /// Store the signed payload; the unsigned one is no longer needed.
    pub fn set_signed(&mut self, payload: SignedPayload) {
        self.unsigned = None;
        self.signed = Some(payload);
    }

    /// Record the submitted hash. The signed payload is dropped so it can
    /// never be resubmitted from this attempt.
    pub fn set_hash(&mut self, hash: TxHash) {
        self.signed = None;
        self.hash = Some(hash);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> AttemptKind {
        self.kind
    }

    pub fn campaign(&self) -> &Address {
        &self.campaign
    }

    pub fn amount(&self) -> Option<MinorUnits> {
        self.amount
    }

    pub fn unsigned(&self) -> Option<&UnsignedPayload> {
        self.unsigned.as_ref()
    }

    pub fn signed(&self) -> Option<&SignedPayload> {
        self.signed.as_ref()
    }

    pub fn hash(&self) -> Option<&TxHash> {
        self.hash.as_ref()
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn last_error(&self) -> Option<&DonationError> {
        self.last_error.as_ref()
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }
}
