//! Strongly typed ledger identities and transaction payloads.
//!
//! # Identity Rules
//! - Account keys and contract addresses are StrKey strings (56 chars, base32)
//! - Account keys start with `G`, contract addresses with `C`; `Address` accepts both
//! - Values are validated once at construction and immutable afterwards

pub mod address;
pub mod payload;

pub use address::{Address, AddressError, ContractAddress, PublicKey};
pub use payload::{SignedPayload, TxHash, UnsignedPayload};
