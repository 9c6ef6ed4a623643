use crate::sync::digest::DigestAlgorithm;
use crate::sync::error::{DeltaError, DeltaResult};
use serde::{Deserialize, Serialize};

/// Default block length for fingerprints (4KB)
pub const DEFAULT_BLOCK_LENGTH: u32 = 4096;

/// Fingerprint of a single block of the reference stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockFingerprint {
    /// Ordinal position of the block in the reference stream
    pub index: u64,
    /// Adler-32 of the block (zero-padded if it is a short final block)
    pub checksum: u32,
    /// Strong digest of the block, same padding as `checksum`
    pub digest: Vec<u8>,
}

/// Fingerprints of a whole reference stream
///
/// Built once per reference version and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    pub fingerprints: Vec<BlockFingerprint>,
    pub block_length: u32,
    /// Unpadded number of bytes that were fingerprinted
    pub stream_length: u64,
    pub stream_digest: Vec<u8>,
    pub algorithm: DigestAlgorithm,
}

impl FingerprintRecord {
    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.fingerprints.len()
    }

    /// Number of blocks a stream of `stream_length` bytes is split into
    pub fn expected_block_count(stream_length: u64, block_length: u32) -> u64 {
        stream_length.div_ceil(block_length as u64)
    }

    /// Serialize to bytes (using bincode)
    pub fn to_bytes(&self) -> DeltaResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes
    pub fn from_bytes(data: &[u8]) -> DeltaResult<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

/// A reference block found in a scanned stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub block: BlockFingerprint,
    /// Offset in the scanned stream where the block content starts
    pub position: u64,
}

impl MatchInfo {
    pub fn new(block: BlockFingerprint, position: u64) -> Self {
        Self { block, position }
    }
}

/// Settings shared by the fingerprint builder and the matcher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeltaConfig {
    pub block_length: u32,
    /// Strong digest name, resolved with [`DigestAlgorithm::from_name`]
    pub digest: String,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            block_length: DEFAULT_BLOCK_LENGTH,
            digest: DigestAlgorithm::Sha256.name().to_string(),
        }
    }
}

impl DeltaConfig {
    pub fn block_length(mut self, block_length: u32) -> Self {
        self.block_length = block_length;
        self
    }

    pub fn digest(mut self, name: impl Into<String>) -> Self {
        self.digest = name.into();
        self
    }

    pub fn digest_algorithm(&self) -> DeltaResult<DigestAlgorithm> {
        DigestAlgorithm::from_name(&self.digest)
    }

    pub fn validate(&self) -> DeltaResult<()> {
        if self.block_length == 0 {
            return Err(DeltaError::InvalidBlockLength(self.block_length));
        }
        self.digest_algorithm()?;
        Ok(())
    }

    /// Parse from a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> DeltaResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
