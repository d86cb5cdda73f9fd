//! Ledger endpoint integration.
//!
//! # Data Flow
//! ```text
//! NetworkEnvironment.ledger_endpoint_url (+ read-only failovers)
//!     → client.rs (HTTP with timeouts; reads retried, submit single-shot)
//!     → types.rs (AccountInfo, TransactionStatus, LedgerError)
//! ```
//!
//! # Operations
//! - `load_account`: account presence, sequence and balances
//! - `submit`: hand a signed envelope to the network, returns its hash
//! - `transaction_status`: one immediate status check, used for polling
//! - `transactions_for_account` / `payments_for_account`: newest-first history
//! - `wait_for_confirmation`: cancellable polling loop over `transaction_status`

pub mod client;
pub mod confirmation;
pub mod types;

pub use client::{HorizonClient, LedgerApi};
pub use confirmation::{wait_for_confirmation, ConfirmationOutcome};
pub use types::{
    calculate_fee, AccountInfo, Asset, Balance, LedgerError, LedgerResult, PaymentRecord, TransactionStatus,
    TransactionSummary,
};
