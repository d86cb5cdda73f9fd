//! Progress and invalidation events published by the orchestrator.

use serde::Serialize;
use uuid::Uuid;

use crate::error::ErrorKind;
use crate::orchestrator::attempt::{AttemptKind, AttemptState};
use crate::primitives::{Address, TxHash};

/// Latest state of the most recent attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptProgress {
    pub attempt_id: Uuid,
    pub kind: AttemptKind,
    pub campaign_address: Address,
    pub state: AttemptState,
    pub tx_hash: Option<TxHash>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed(ErrorKind),
}

/// Cached campaign and contribution data for `campaign_address` is stale
/// and must be re-fetched from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invalidation {
    pub attempt_id: Uuid,
    pub campaign_address: Address,
    pub kind: AttemptKind,
    pub outcome: AttemptOutcome,
}

/// Successful terminal result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub attempt_id: Uuid,
    pub kind: AttemptKind,
    pub campaign_address: Address,
    pub hash: TxHash,
}
