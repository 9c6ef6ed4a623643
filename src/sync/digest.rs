//! Strong digests used to confirm weak checksum hits
//!
//! The algorithm is chosen by name when a builder or config is constructed;
//! an unknown name is a configuration error reported immediately.

use crate::sync::error::{DeltaError, DeltaResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Resolve an algorithm from its name, e.g. `"SHA-256"` or `"blake3"`
    pub fn from_name(name: &str) -> DeltaResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha-256" | "sha256" => Ok(DigestAlgorithm::Sha256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            _ => Err(DeltaError::UnsupportedDigest(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Blake3 => "BLAKE3",
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        32
    }

    pub fn hasher(&self) -> StrongHasher {
        StrongHasher::new(*self)
    }

    /// One-shot digest of `data`
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize_reset()
    }
}

impl FromStr for DigestAlgorithm {
    type Err = DeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Incremental hasher for one of the supported algorithms
#[derive(Clone)]
pub enum StrongHasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl StrongHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => StrongHasher::Sha256(Sha256::new()),
            DigestAlgorithm::Blake3 => StrongHasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self {
            StrongHasher::Sha256(_) => DigestAlgorithm::Sha256,
            StrongHasher::Blake3(_) => DigestAlgorithm::Blake3,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StrongHasher::Sha256(h) => h.update(data),
            StrongHasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    /// Return the digest of everything fed so far and start over
    pub fn finalize_reset(&mut self) -> Vec<u8> {
        match self {
            StrongHasher::Sha256(h) => h.finalize_reset().to_vec(),
            StrongHasher::Blake3(h) => {
                let out = h.finalize().as_bytes().to_vec();
                h.reset();
                out
            }
        }
    }
}

impl fmt::Debug for StrongHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StrongHasher").field(&self.algorithm()).finish()
    }
}
