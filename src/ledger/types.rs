//! Ledger types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::amount::MinorUnits;
use crate::primitives::{PublicKey, TxHash};

/// Errors that can occur talking to the ledger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The address has no presence on the network (never funded).
    #[error("account {0} not found on the network")]
    AccountNotFound(String),

    /// The network validated and rejected the transaction.
    #[error("transaction rejected: {message}")]
    SubmissionRejected {
        message: String,
        /// Transaction result code followed by per-operation codes.
        reason_codes: Vec<String>,
    },

    /// Transport failure or endpoint outage.
    #[error("ledger endpoint unavailable: {message}")]
    NetworkUnavailable {
        message: String,
        /// Whether a submission may have reached the network before failing.
        maybe_submitted: bool,
    },

    /// The endpoint answered with something we cannot interpret.
    #[error("unexpected ledger response: {0}")]
    Protocol(String),

    /// Client settings that cannot be used with the selected network.
    #[error("invalid ledger configuration: {0}")]
    Configuration(String),
}

impl LedgerError {
    pub(crate) fn unavailable(message: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            message: message.into(),
            maybe_submitted: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkUnavailable { .. })
    }

    /// Short label used in metrics and log fields.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::AccountNotFound(_) => "account_not_found",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::NetworkUnavailable { .. } => "network_unavailable",
            Self::Protocol(_) => "protocol",
            Self::Configuration(_) => "configuration",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of one status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Not yet visible in a closed ledger.
    Pending,
    Successful,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Asset {
    Native,
    Credit { code: String, issuer: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: Asset,
    pub amount: MinorUnits,
}

/// Snapshot of an account as reported by the ledger endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: PublicKey,
    pub sequence: u64,
    pub balances: Vec<Balance>,
}

impl AccountInfo {
    pub fn native_balance(&self) -> MinorUnits {
        self.balances
            .iter()
            .find(|b| b.asset == Asset::Native)
            .map(|b| b.amount)
            .unwrap_or_default()
    }

    pub fn balance_of(&self, code: &str, issuer: &str) -> MinorUnits {
        self.balances
            .iter()
            .find(|b| matches!(&b.asset, Asset::Credit { code: c, issuer: i } if c == code && i == issuer))
            .map(|b| b.amount)
            .unwrap_or_default()
    }
}

/// One entry of an account's transaction history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub hash: TxHash,
    pub ledger: u64,
    pub created_at: String,
    pub successful: bool,
    pub source_account: String,
    pub operation_count: u32,
    /// Fee actually charged, in minor units.
    pub fee_charged: MinorUnits,
}

/// One value movement touching an account.
///
/// Covers plain payments, path payments and account creation. Operation
/// kinds without a sender/amount (contract invocations) leave those unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: String,
    pub operation_type: String,
    pub transaction_hash: TxHash,
    pub created_at: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub asset: Option<Asset>,
    pub amount: Option<MinorUnits>,
}

/// Inclusion fee for a transaction with `operation_count` operations.
pub fn calculate_fee(base_fee: u64, operation_count: u32) -> u64 {
    base_fee.saturating_mul(u64::from(operation_count.max(1)))
}
