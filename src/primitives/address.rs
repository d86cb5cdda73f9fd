//! StrKey validation for account keys and contract addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Encoded length of every StrKey identity.
pub const STRKEY_LEN: usize = 56;

/// Errors produced while parsing a ledger identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("expected {STRKEY_LEN} characters, got {0}")]
    Length(usize),

    #[error("expected prefix '{expected}', got '{actual}'")]
    Prefix { expected: char, actual: char },

    #[error("invalid character '{0}' (base32 alphabet A-Z, 2-7)")]
    Alphabet(char),
}

fn validate(raw: &str, prefixes: &[char]) -> Result<(), AddressError> {
    if raw.len() != STRKEY_LEN {
        return Err(AddressError::Length(raw.chars().count()));
    }
    let mut chars = raw.chars();
    // Length was checked above, so the first char exists.
    let first = chars.next().unwrap_or_default();
    if !prefixes.contains(&first) {
        return Err(AddressError::Prefix {
            expected: prefixes[0],
            actual: first,
        });
    }
    match chars.find(|c| !matches!(c, 'A'..='Z' | '2'..='7')) {
        Some(bad) => Err(AddressError::Alphabet(bad)),
        None => Ok(()),
    }
}

/// An account public key (`G...`), the signer and role identity of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey(String);

impl PublicKey {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        validate(raw, &['G'])?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for log lines and prompts (`GABC…WXYZ`).
    pub fn abbreviated(&self) -> String {
        format!("{}…{}", &self.0[..4], &self.0[STRKEY_LEN - 4..])
    }
}

/// A deployed contract address (`C...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        validate(raw, &['C'])?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Any ledger identity that can hold funds or state: an account or a contract.
///
/// Campaigns are addressed this way since a campaign may be keyed by its
/// creator's account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let raw = raw.trim();
        validate(raw, &['G', 'C'])?;
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_account(&self) -> bool {
        self.0.starts_with('G')
    }
}

impl From<PublicKey> for Address {
    fn from(key: PublicKey) -> Self {
        Self(key.0)
    }
}

impl From<ContractAddress> for Address {
    fn from(contract: ContractAddress) -> Self {
        Self(contract.0)
    }
}

macro_rules! string_identity {
    ($ty:ident) => {
        impl FromStr for $ty {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = AddressError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_identity!(PublicKey);
string_identity!(ContractAddress);
string_identity!(Address);
