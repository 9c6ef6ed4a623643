//! Fingerprint generation for delta transfer
//!
//! Splits a reference stream into fixed-length blocks and records, for each
//! block, its Adler-32 and strong digest, together with a digest of the whole
//! stream. Input can arrive in chunks of any size; block boundaries are
//! tracked across calls.

use crate::metrics;
use crate::sync::digest::{DigestAlgorithm, StrongHasher};
use crate::sync::error::{DeltaError, DeltaResult};
use crate::sync::rolling_hash::{RollingAdler32, RollingChecksum};
use crate::sync::types::{BlockFingerprint, DeltaConfig, FingerprintRecord};
use std::io::{ErrorKind, Read};
use tokio_util::sync::CancellationToken;

/// Builder for fingerprint records
///
/// Single pass over the input, O(number of blocks) memory. After
/// [`finish`](Self::finish) the builder is empty again and can be reused.
#[derive(Debug)]
pub struct BlockFingerprintBuilder {
    block_length: u32,
    algorithm: DigestAlgorithm,
    block_checksum: RollingAdler32,
    block_hasher: StrongHasher,
    stream_hasher: StrongHasher,
    /// Bytes of the current block seen so far
    block_fill: usize,
    processed: u64,
    fingerprints: Vec<BlockFingerprint>,
}

impl BlockFingerprintBuilder {
    pub fn new(block_length: u32, algorithm: DigestAlgorithm) -> DeltaResult<Self> {
        if block_length == 0 {
            return Err(DeltaError::InvalidBlockLength(block_length));
        }

        Ok(Self {
            block_length,
            algorithm,
            block_checksum: RollingAdler32::new(block_length as usize),
            block_hasher: algorithm.hasher(),
            stream_hasher: algorithm.hasher(),
            block_fill: 0,
            processed: 0,
            fingerprints: Vec::new(),
        })
    }

    pub fn from_config(config: &DeltaConfig) -> DeltaResult<Self> {
        Self::new(config.block_length, config.digest_algorithm()?)
    }

    pub fn block_length(&self) -> u32 {
        self.block_length
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Bytes fed since the last reset
    pub fn processed_bytes(&self) -> u64 {
        self.processed
    }

    /// Feed the next chunk of the stream
    pub fn update(&mut self, data: &[u8]) {
        self.stream_hasher.update(data);
        self.processed += data.len() as u64;

        let block_length = self.block_length as usize;
        let mut rest = data;
        while !rest.is_empty() {
            let take = (block_length - self.block_fill).min(rest.len());
            let (head, tail) = rest.split_at(take);

            self.block_checksum.update_slice(head);
            self.block_hasher.update(head);
            self.block_fill += take;
            rest = tail;

            if self.block_fill == block_length {
                self.emit_block();
            }
        }
    }

    /// Feed `length` bytes of `data` starting at `offset`
    pub fn update_range(&mut self, data: &[u8], offset: usize, length: usize) {
        self.update(&data[offset..offset + length]);
    }

    /// Close the stream and return its record.
    ///
    /// A short final block is zero-padded to the block length before its
    /// checksum and digest are taken; `stream_length` stays unpadded.
    pub fn finish(&mut self) -> FingerprintRecord {
        if self.block_fill > 0 {
            let padding = vec![0u8; self.block_length as usize - self.block_fill];
            self.block_checksum.update_slice(&padding);
            self.block_hasher.update(&padding);
            self.emit_block();
        }

        let record = FingerprintRecord {
            fingerprints: std::mem::take(&mut self.fingerprints),
            block_length: self.block_length,
            stream_length: self.processed,
            stream_digest: self.stream_hasher.finalize_reset(),
            algorithm: self.algorithm,
        };
        self.processed = 0;

        tracing::debug!(
            blocks = record.block_count(),
            stream_length = record.stream_length,
            block_length = record.block_length,
            "Fingerprint record built"
        );
        metrics::record_fingerprints_built(record.block_count(), record.stream_length);

        record
    }

    /// Discard everything fed since the last [`finish`](Self::finish)
    pub fn reset(&mut self) {
        self.block_checksum.reset();
        self.block_hasher.finalize_reset();
        self.stream_hasher.finalize_reset();
        self.block_fill = 0;
        self.processed = 0;
        self.fingerprints.clear();
    }

    /// Build a record from an in-memory buffer
    pub fn build_from_bytes(&mut self, data: &[u8]) -> FingerprintRecord {
        self.update(data);
        self.finish()
    }

    /// Build a record from a reader, checking `cancel` once per block read
    pub fn build_from_reader<R: Read>(
        &mut self,
        reader: &mut R,
        cancel: &CancellationToken,
    ) -> DeltaResult<FingerprintRecord> {
        let mut buffer = vec![0u8; self.block_length as usize];

        loop {
            if cancel.is_cancelled() {
                self.reset();
                return Err(DeltaError::Cancelled);
            }

            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.reset();
                    return Err(e.into());
                }
            };
            self.update(&buffer[..bytes_read]);
        }

        Ok(self.finish())
    }

    fn emit_block(&mut self) {
        self.fingerprints.push(BlockFingerprint {
            index: self.fingerprints.len() as u64,
            checksum: self.block_checksum.value(),
            digest: self.block_hasher.finalize_reset(),
        });
        self.block_checksum.reset();
        self.block_fill = 0;
    }
}
