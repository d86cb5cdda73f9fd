//! Serialized transaction envelopes and hashes.
//!
//! Payloads are opaque base64 XDR envelopes: this crate never decodes them,
//! it only carries them between the contract endpoint, the wallet and the
//! ledger endpoint.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope prepared by the contract endpoint, not yet signed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnsignedPayload(String);

/// Envelope after the wallet agent applied its signature.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedPayload(String);

macro_rules! envelope {
    ($ty:ident) => {
        impl $ty {
            pub fn new(xdr: impl Into<String>) -> Self {
                Self(xdr.into())
            }

            pub fn as_xdr(&self) -> &str {
                &self.0
            }

            pub fn into_xdr(self) -> String {
                self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        // Envelopes can be large; keep logs readable.
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("len", &self.0.len())
                    .finish()
            }
        }
    };
}

envelope!(UnsignedPayload);
envelope!(SignedPayload);

/// Hash of a submitted transaction (64 hex chars).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the hash has the shape the ledger endpoint reports.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 64 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_debug_hides_envelope() {
        let payload = UnsignedPayload::new("AAAAAgAAAAB".repeat(10));
        let rendered = format!("{:?}", payload);
        assert!(rendered.contains("len"));
        assert!(!rendered.contains("AAAAAgAAAAB"));
    }

    #[test]
    fn test_tx_hash_normalized() {
        let hash = TxHash::new("AB".repeat(32));
        assert_eq!(hash.as_str(), "ab".repeat(32));
        assert!(hash.is_well_formed());
        assert!(!TxHash::new("xyz").is_well_formed());
    }
}
