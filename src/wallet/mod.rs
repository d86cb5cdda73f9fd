//! Wallet adapter subsystem.
//!
//! # Data Flow
//! ```text
//! AgentRuntime (host-provided globals: "freighter", "xBull", "Albedo")
//!     → agent.rs (JSON method-call bridge, agent faults)
//!     → freighter.rs / xbull.rs / albedo.rs (per-agent call shapes)
//!     → adapter.rs (uniform WalletAdapter capability set + error kinds)
//!     → registry.rs (WalletKind → adapter)
//! ```
//!
//! # Security Constraints
//! - Private keys never leave the agent; adapters only see public keys
//! - Signing always names the network passphrase of the active environment
//! - Agent failures are classified, never swallowed into success

pub mod adapter;
pub mod agent;
pub mod albedo;
pub mod freighter;
pub mod registry;
pub mod xbull;

pub use adapter::{WalletAdapter, WalletError, WalletKind, WalletResult};
pub use agent::{AgentBridge, AgentFault, AgentRuntime, InProcessRuntime};
pub use albedo::AlbedoAdapter;
pub use freighter::FreighterAdapter;
pub use registry::WalletRegistry;
pub use xbull::XBullAdapter;
