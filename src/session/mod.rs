//! Wallet session state.
//!
//! # Lifecycle
//! ```text
//! Disconnected ──connect──▶ Connecting ──ok──▶ Connected ──disconnect/replace──▶ Disconnected
//!                                └──err──▶ Error ──disconnect──▶ Disconnected
//! ```
//!
//! Ending a session fires its teardown signal; attempts holding a lease
//! stop waiting for signatures and confirmations.

pub mod state;
pub mod teardown;

pub use state::{AttemptLease, ConnectionStatus, LeaseError, SessionSnapshot, SessionState, WalletSession};
pub use teardown::{Teardown, TeardownListener, TeardownReason};
