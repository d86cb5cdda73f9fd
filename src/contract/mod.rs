//! Crowdfunding contract client.
//!
//! # Architecture
//! ```text
//! ContractClient ──(sequence)──▶ LedgerApi
//!       │
//!       └──(simulateInvocation)──▶ ContractRpc ──▶ simulation endpoint
//! ```
//!
//! Arguments are checked against a static method table before anything
//! touches the network.

pub mod client;
pub mod rpc;
pub mod types;

pub use client::ContractClient;
pub use rpc::{ContractRpc, SimulationRequest, SimulationResponse, SorobanRpcClient};
pub use types::{
    ArgType, Campaign, ContractError, ContractMethod, ContractResult, ContributionRecord, Invocation, ScArg,
};
