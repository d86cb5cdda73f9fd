//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Read-only query against a remote endpoint:
//!     → per-request deadline (reqwest timeout)
//!     → On transport failure: retries.rs (retry with backoff.rs delay)
//!
//! Transaction submission:
//!     → single attempt, never retried, never failed over
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Retries only for idempotent reads (account, status, contract reads)
//! - A signed payload is submitted at most once

pub mod backoff;
pub mod retries;

pub use retries::{retry_idempotent, RetryPolicy};
