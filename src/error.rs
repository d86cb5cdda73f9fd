//! Caller-facing error taxonomy.
//!
//! Component errors (`WalletError`, `LedgerError`, `ContractError`, ...)
//! are folded into [`DonationError`]; callers branch on [`ErrorKind`].

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::amount::AmountError;
use crate::config::ConfigError;
use crate::contract::ContractError;
use crate::ledger::LedgerError;
use crate::network::EnvironmentError;
use crate::primitives::{AddressError, TxHash};
use crate::wallet::WalletError;

/// Stable classification of every failure a caller can see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    ConfigurationError,
    WalletUnavailable,
    NotConnected,
    UserRejected,
    SigningRejected,
    UserCancelled,
    WalletError,
    InvalidArguments,
    InvalidAmount,
    ContractCallFailed,
    SubmissionRejected,
    NetworkUnavailable,
    AccountNotFound,
    AttemptInProgress,
    TransactionFailed,
    ConfirmationTimeout,
    ConfirmationCancelled,
    /// A remote endpoint answered with something unreadable.
    UnexpectedResponse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::WalletUnavailable => "wallet_unavailable",
            Self::NotConnected => "not_connected",
            Self::UserRejected => "user_rejected",
            Self::SigningRejected => "signing_rejected",
            Self::UserCancelled => "user_cancelled",
            Self::WalletError => "wallet_error",
            Self::InvalidArguments => "invalid_arguments",
            Self::InvalidAmount => "invalid_amount",
            Self::ContractCallFailed => "contract_call_failed",
            Self::SubmissionRejected => "submission_rejected",
            Self::NetworkUnavailable => "network_unavailable",
            Self::AccountNotFound => "account_not_found",
            Self::AttemptInProgress => "attempt_in_progress",
            Self::TransactionFailed => "transaction_failed",
            Self::ConfirmationTimeout => "confirmation_timeout",
            Self::ConfirmationCancelled => "confirmation_cancelled",
            Self::UnexpectedResponse => "unexpected_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DonationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("no wallet connected")]
    NotConnected,

    #[error("action cancelled: {0}")]
    UserCancelled(String),

    #[error("another transaction is already in progress for this wallet")]
    AttemptInProgress,

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("contract call failed: {message}")]
    ContractCallFailed { message: String, reason_codes: Vec<String> },

    #[error("transaction rejected: {message}")]
    SubmissionRejected { message: String, reason_codes: Vec<String> },

    #[error("network unavailable: {message}")]
    NetworkUnavailable { message: String, maybe_submitted: bool },

    #[error("account {0} not found on the network, fund it first")]
    AccountNotFound(String),

    #[error("transaction {hash} failed on the network")]
    TransactionFailed { hash: TxHash },

    #[error("transaction {hash} not confirmed within {timeout_secs}s, re-check campaign state before retrying")]
    ConfirmationTimeout { hash: TxHash, timeout_secs: u64 },

    #[error("confirmation of {hash} stopped because the wallet session ended")]
    ConfirmationCancelled { hash: TxHash },

    #[error("unexpected response from the ledger: {0}")]
    UnexpectedResponse(String),
}

impl DonationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::Wallet(e) => match e {
                WalletError::WalletUnavailable(_) => ErrorKind::WalletUnavailable,
                WalletError::UserRejected(_) => ErrorKind::UserRejected,
                WalletError::NotConnected => ErrorKind::NotConnected,
                WalletError::SigningRejected => ErrorKind::SigningRejected,
                WalletError::UnknownKind(_) => ErrorKind::InvalidArguments,
                WalletError::SigningError(_) | WalletError::Agent(_) => ErrorKind::WalletError,
            },
            Self::NotConnected => ErrorKind::NotConnected,
            Self::UserCancelled(_) => ErrorKind::UserCancelled,
            Self::AttemptInProgress => ErrorKind::AttemptInProgress,
            Self::InvalidAmount(_) => ErrorKind::InvalidAmount,
            Self::InvalidArguments(_) => ErrorKind::InvalidArguments,
            Self::ContractCallFailed { .. } => ErrorKind::ContractCallFailed,
            Self::SubmissionRejected { .. } => ErrorKind::SubmissionRejected,
            Self::NetworkUnavailable { .. } => ErrorKind::NetworkUnavailable,
            Self::AccountNotFound(_) => ErrorKind::AccountNotFound,
            Self::TransactionFailed { .. } => ErrorKind::TransactionFailed,
            Self::ConfirmationTimeout { .. } => ErrorKind::ConfirmationTimeout,
            Self::ConfirmationCancelled { .. } => ErrorKind::ConfirmationCancelled,
            Self::UnexpectedResponse(_) => ErrorKind::UnexpectedResponse,
        }
    }

    /// Remote-provided reason codes, empty when the failure was local.
    pub fn reason_codes(&self) -> &[String] {
        match self {
            Self::ContractCallFailed { reason_codes, .. } | Self::SubmissionRejected { reason_codes, .. } => {
                reason_codes
            }
            _ => &[],
        }
    }

    /// A fresh attempt may succeed without any user action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable {
                maybe_submitted: false,
                ..
            }
        )
    }

    /// The transaction may or may not have applied; re-query state.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            Self::ConfirmationTimeout { .. }
                | Self::ConfirmationCancelled { .. }
                | Self::NetworkUnavailable {
                    maybe_submitted: true,
                    ..
                }
        )
    }

    /// The user ended the action themselves; not worth an error toast.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UserCancelled | ErrorKind::UserRejected | ErrorKind::SigningRejected
        )
    }

    /// Hash of a submitted transaction, when the failure happened after submit.
    pub fn transaction_hash(&self) -> Option<&TxHash> {
        match self {
            Self::TransactionFailed { hash }
            | Self::ConfirmationTimeout { hash, .. }
            | Self::ConfirmationCancelled { hash } => Some(hash),
            _ => None,
        }
    }
}

impl From<LedgerError> for DonationError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AccountNotFound(account) => Self::AccountNotFound(account),
            LedgerError::SubmissionRejected { message, reason_codes } => {
                Self::SubmissionRejected { message, reason_codes }
            }
            LedgerError::NetworkUnavailable {
                message,
                maybe_submitted,
            } => Self::NetworkUnavailable {
                message,
                maybe_submitted,
            },
            LedgerError::Protocol(message) => Self::UnexpectedResponse(message),
            LedgerError::Configuration(message) => Self::Configuration(message),
        }
    }
}

impl From<ContractError> for DonationError {
    fn from(e: ContractError) -> Self {
        match e {
            ContractError::InvalidArguments(message) => Self::InvalidArguments(message),
            ContractError::ContractCallFailed { message, reason_codes } => {
                Self::ContractCallFailed { message, reason_codes }
            }
            ContractError::NetworkUnavailable(message) => Self::NetworkUnavailable {
                message,
                maybe_submitted: false,
            },
            ContractError::Ledger(e) => e.into(),
            ContractError::Protocol(message) => Self::ContractCallFailed {
                message,
                reason_codes: Vec::new(),
            },
        }
    }
}

impl From<AddressError> for DonationError {
    fn from(e: AddressError) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}

impl From<ConfigError> for DonationError {
    fn from(e: ConfigError) -> Self {
        Self::Configuration(e.to_string())
    }
}

impl From<EnvironmentError> for DonationError {
    fn from(e: EnvironmentError) -> Self {
        Self::Configuration(e.to_string())
    }
}
