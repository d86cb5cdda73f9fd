//! Crowdfunding donation orchestration over a Stellar-style ledger.
//!
//! Wallet adapters, ledger and contract clients, and the attempt state
//! machine that ties them together.

pub mod amount;
pub mod config;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod network;
pub mod observability;
pub mod orchestrator;
pub mod primitives;
pub mod resilience;
pub mod service;
pub mod session;
pub mod wallet;

pub use config::AppConfig;
pub use error::{DonationError, ErrorKind};
pub use service::DonationService;
