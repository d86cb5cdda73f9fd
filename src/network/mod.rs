//! Network environment resolution.
//!
//! # Data Flow
//! ```text
//! NetworkConfig (profile name + overrides)
//!     → profiles.rs (built-in testnet / public parameters)
//!     → environment.rs (merge, consistency checks)
//!     → NetworkEnvironment (immutable snapshot, shared via Arc)
//! ```
//!
//! The passphrase in the snapshot is what wallets sign for and what the
//! ledger endpoint verifies, so every component must read it from the same
//! snapshot.

pub mod environment;
pub mod profiles;

pub use environment::{check_endpoint_network, resolve, EnvironmentError, NetworkContext, NetworkEnvironment, NetworkId};
pub use profiles::NetworkProfile;
