//! Fingerprint engine.
//!
//! A fingerprint identifies one (source image, operation set) pair. It is the
//! key for both the result cache and the version ledger, so it must be a pure
//! function of its inputs: same source bytes and same semantic operation set
//! always produce the same fingerprint, on any worker, at any time.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::operations::OperationSet;

/// Compute the content hash (sha256, lowercase hex) of raw image bytes.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// A 64-character hex identifier for a (source, operations) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint from a source content hash and the canonical
    /// form of an operation set.
    ///
    /// The operation set has already been validated at construction, so the
    /// canonical form is well defined: operation order preserved, parameter
    /// keys sorted within each operation.
    pub fn compute(source_content_hash: &str, ops: &OperationSet) -> Fingerprint {
        let mut hasher = Sha256::new();
        hasher.update(source_content_hash.as_bytes());
        hasher.update(b":");
        hasher.update(ops.canonical().as_bytes());
        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Wrap an existing fingerprint string (e.g. read back from the ledger).
    pub fn from_string(value: String) -> Fingerprint {
        Fingerprint(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
