//! Block matching against a fingerprint record
//!
//! Scans a stream byte by byte with a rolling Adler-32 the size of one block.
//! Every window whose checksum appears in the record is confirmed with the
//! strong digest before it is reported, so weak checksum collisions only cost
//! time. A confirmed match consumes its bytes: the window restarts right after
//! it and matches never overlap.

use crate::metrics;
use crate::sync::digest::{DigestAlgorithm, StrongHasher};
use crate::sync::error::{DeltaError, DeltaResult};
use crate::sync::rolling_hash::{RollingAdler32, RollingChecksum};
use crate::sync::types::{BlockFingerprint, FingerprintRecord, MatchInfo};
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use tokio_util::sync::CancellationToken;

/// Streaming matcher for one scan of one stream
///
/// Feed the stream with [`feed`](Self::feed) and close it with
/// [`finish`](Self::finish); or use [`match_bytes`](Self::match_bytes) /
/// [`match_reader`](Self::match_reader) for the whole thing.
#[derive(Debug)]
pub struct BlockMatcher<'a> {
    record: &'a FingerprintRecord,
    /// Weak checksum -> indices into `record.fingerprints`
    lookup: HashMap<u32, Vec<usize>>,
    checksum: RollingAdler32,
    hasher: StrongHasher,
    window: Vec<u8>,
    /// Stream bytes fed so far
    offset: u64,
    matched_bytes: u64,
    match_count: usize,
}

impl<'a> BlockMatcher<'a> {
    pub fn new(record: &'a FingerprintRecord) -> DeltaResult<Self> {
        if record.block_length == 0 {
            return Err(DeltaError::InvalidBlockLength(record.block_length));
        }
        let expected =
            FingerprintRecord::expected_block_count(record.stream_length, record.block_length);
        if record.block_count() as u64 != expected {
            return Err(DeltaError::InvalidRecord {
                blocks: record.block_count(),
                expected,
            });
        }

        let mut lookup: HashMap<u32, Vec<usize>> = HashMap::new();
        for (idx, block) in record.fingerprints.iter().enumerate() {
            lookup.entry(block.checksum).or_default().push(idx);
        }

        let block_length = record.block_length as usize;
        Ok(Self {
            record,
            lookup,
            checksum: RollingAdler32::new(block_length),
            hasher: record.algorithm.hasher(),
            window: vec![0; block_length],
            offset: 0,
            matched_bytes: 0,
            match_count: 0,
        })
    }

    pub fn block_length(&self) -> u32 {
        self.record.block_length
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.record.algorithm
    }

    /// Bytes of the stream scanned so far
    pub fn scanned_bytes(&self) -> u64 {
        self.offset
    }

    /// Bytes of the stream covered by matches so far
    pub fn matched_bytes(&self) -> u64 {
        self.matched_bytes
    }

    /// Candidate fingerprints sharing a weak checksum
    pub fn candidates(&self, checksum: u32) -> impl Iterator<Item = &BlockFingerprint> + '_ {
        self.lookup
            .get(&checksum)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.record.fingerprints[idx])
    }

    /// Scan the next chunk of the stream, returning the matches completed in it
    pub fn feed(&mut self, data: &[u8]) -> Vec<MatchInfo> {
        let mut matches = Vec::new();

        if self.lookup.is_empty() {
            self.offset += data.len() as u64;
            return matches;
        }

        let block_length = self.record.block_length as u64;
        for &byte in data {
            self.checksum.update(byte);
            self.offset += 1;

            if !self.checksum.is_window_full() {
                continue;
            }
            if let Some(block) = self.confirm_window() {
                matches.push(MatchInfo::new(block, self.offset - block_length));
                self.checksum.reset();
                self.matched_bytes += block_length;
            }
        }

        self.match_count += matches.len();
        matches
    }

    /// Close the stream.
    ///
    /// An unmatched tail shorter than a block is zero-padded to the block
    /// length, the same way the builder pads the last block, and checked one
    /// last time. The matcher is ready for a new stream afterwards.
    pub fn finish(&mut self) -> Option<MatchInfo> {
        let tail = self.checksum.window_len();
        let mut result = None;

        if tail > 0 && !self.checksum.is_window_full() {
            let block_length = self.record.block_length as usize;
            for _ in tail..block_length {
                self.checksum.update(0);
            }
            if let Some(block) = self.confirm_window() {
                self.matched_bytes += tail as u64;
                self.match_count += 1;
                result = Some(MatchInfo::new(block, self.offset - tail as u64));
            }
        }

        tracing::debug!(
            scanned = self.offset,
            matched = self.matched_bytes,
            matches = self.match_count,
            "Block matching finished"
        );
        metrics::record_scan(self.offset, self.match_count, self.matched_bytes);

        self.checksum.reset();
        self.offset = 0;
        self.matched_bytes = 0;
        self.match_count = 0;
        result
    }

    /// Match an in-memory buffer
    pub fn match_bytes(&mut self, data: &[u8]) -> Vec<MatchInfo> {
        let mut matches = self.feed(data);
        matches.extend(self.finish());
        matches
    }

    /// Match a stream read to its end, checking `cancel` once per block read
    pub fn match_reader<R: Read>(
        &mut self,
        reader: &mut R,
        cancel: &CancellationToken,
    ) -> DeltaResult<Vec<MatchInfo>> {
        let mut buffer = vec![0u8; self.record.block_length as usize];
        let mut matches = Vec::new();

        loop {
            if cancel.is_cancelled() {
                self.abandon();
                return Err(DeltaError::Cancelled);
            }

            let bytes_read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.abandon();
                    return Err(e.into());
                }
            };
            matches.extend(self.feed(&buffer[..bytes_read]));
        }

        matches.extend(self.finish());
        Ok(matches)
    }

    /// Strong-digest the current window and compare it with every candidate
    /// sharing its checksum. The digest is computed at most once per window.
    fn confirm_window(&mut self) -> Option<BlockFingerprint> {
        let candidates = self.lookup.get(&self.checksum.value())?;

        let len = self.checksum.peek_window(&mut self.window);
        self.hasher.update(&self.window[..len]);
        let digest = self.hasher.finalize_reset();

        candidates
            .iter()
            .map(|&idx| &self.record.fingerprints[idx])
            .find(|block| block.digest == digest)
            .cloned()
    }

    fn abandon(&mut self) {
        self.checksum.reset();
        self.offset = 0;
        self.matched_bytes = 0;
        self.match_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::signature::BlockFingerprintBuilder;
    use rand::Rng;
    use std::io::Cursor;

    fn random_bytes(len: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen()).collect()
    }

    fn record_for(data: &[u8], block_length: u32) -> FingerprintRecord {
        BlockFingerprintBuilder::new(block_length, DigestAlgorithm::Sha256)
            .unwrap()
            .build_from_bytes(data)
    }

    #[test]
    fn test_identical_stream_matches_every_block() {
        let data = random_bytes(300);
        let record = record_for(&data, 100);

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&data);

        let found: Vec<(u64, u64)> = matches.iter().map(|m| (m.block.index, m.position)).collect();
        assert_eq!(found, vec![(0, 0), (1, 100), (2, 200)]);
    }

    #[test]
    fn test_self_match_with_partial_tail() {
        let data = random_bytes(64 * 1024 + 7);
        let record = record_for(&data, 128);

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&data);

        assert_eq!(matches.len(), record.block_count());
        for (i, m) in matches.iter().enumerate() {
            assert_eq!(m.block.index, i as u64);
            assert_eq!(m.position, i as u64 * 128);
        }
    }

    #[test]
    fn test_shifted_block_found() {
        let block = vec![b'A'; 100];
        let record = record_for(&block, 100);

        let mut stream = vec![b'B'; 50];
        stream.extend_from_slice(&block);
        stream.extend_from_slice(&[b'C'; 50]);

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&stream);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 50);
        assert_eq!(matches[0].block.index, 0);
    }

    #[test]
    fn test_prefix_not_multiple_of_block() {
        let reference = random_bytes(256);
        let record = record_for(&reference, 256);

        for prefix_len in [1usize, 13, 255, 257, 1000] {
            let mut stream = random_bytes(prefix_len);
            stream.extend_from_slice(&reference);

            let matches = BlockMatcher::new(&record).unwrap().match_bytes(&stream);
            assert_eq!(matches.len(), 1, "prefix {}", prefix_len);
            assert_eq!(matches[0].position, prefix_len as u64);
        }
    }

    #[test]
    fn test_shuffled_blocks_all_found() {
        let mut data = random_bytes(128 * 200 + 7);
        let record = record_for(&data, 128);

        let mut rng = rand::thread_rng();
        let full_blocks = data.len() / 128;
        for i in 0..full_blocks {
            let j = rng.gen_range(0..full_blocks);
            for k in 0..128 {
                data.swap(i * 128 + k, j * 128 + k);
            }
        }

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&data);
        assert_eq!(matches.len(), record.block_count());

        // Every reported window really holds the block's (padded) content
        for m in &matches {
            let pos = m.position as usize;
            let end = (pos + 128).min(data.len());
            let mut window = data[pos..end].to_vec();
            window.resize(128, 0);
            assert_eq!(DigestAlgorithm::Sha256.digest(&window), m.block.digest);
        }
    }

    #[test]
    fn test_matches_are_ordered_and_disjoint() {
        // Repetitive content where every window collides on checksum and digest
        let data = vec![b'x'; 1000];
        let record = record_for(&data[..100], 10);

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&data);
        assert_eq!(matches.len(), 100);
        for pair in matches.windows(2) {
            assert!(pair[0].position + 10 <= pair[1].position);
        }
    }

    #[test]
    fn test_empty_record_never_matches() {
        let record = record_for(&[], 64);
        let mut matcher = BlockMatcher::new(&record).unwrap();

        assert!(matcher.match_bytes(&random_bytes(1000)).is_empty());
        assert!(matcher.match_bytes(&[]).is_empty());
    }

    #[test]
    fn test_short_stream_uses_padded_check() {
        let data = b"tail".to_vec();
        let record = record_for(&data, 16);
        assert_eq!(record.block_count(), 1);

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&data);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].position, 0);

        let other = BlockMatcher::new(&record).unwrap().match_bytes(b"tall");
        assert!(other.is_empty());
    }

    #[test]
    fn test_feed_in_chunks_equals_whole() {
        let reference = random_bytes(5000);
        let record = record_for(&reference, 97);

        let mut candidate = random_bytes(33);
        candidate.extend_from_slice(&reference[1000..4000]);
        candidate.extend_from_slice(&random_bytes(10));
        candidate.extend_from_slice(&reference[4000..]);

        let whole = BlockMatcher::new(&record).unwrap().match_bytes(&candidate);

        let mut matcher = BlockMatcher::new(&record).unwrap();
        let mut chunked = Vec::new();
        for chunk in candidate.chunks(41) {
            chunked.extend(matcher.feed(chunk));
        }
        chunked.extend(matcher.finish());

        assert_eq!(whole, chunked);
        assert!(!whole.is_empty());
    }

    #[test]
    fn test_weak_collision_is_rejected() {
        // Same byte sum and same weighted sum, different content
        let reference = [1u8, 0, 0, 1];
        let candidate = [0u8, 1, 1, 0];
        assert_eq!(
            RollingAdler32::checksum(&reference),
            RollingAdler32::checksum(&candidate)
        );

        let record = record_for(&reference, 4);
        let matcher = BlockMatcher::new(&record).unwrap();
        assert_eq!(
            matcher
                .candidates(RollingAdler32::checksum(&candidate))
                .count(),
            1
        );

        let matches = BlockMatcher::new(&record).unwrap().match_bytes(&candidate);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_inconsistent_record_rejected() {
        let mut record = record_for(&random_bytes(1000), 100);
        record.fingerprints.pop();

        match BlockMatcher::new(&record) {
            Err(DeltaError::InvalidRecord { blocks, expected }) => {
                assert_eq!(blocks, 9);
                assert_eq!(expected, 10);
            }
            other => panic!("expected invalid record, got {:?}", other.map(|_| ())),
        }

        record.stream_length = 900;
        assert!(BlockMatcher::new(&record).is_ok());
    }

    #[test]
    fn test_match_reader() {
        let reference = random_bytes(4096);
        let record = record_for(&reference, 512);

        let mut cursor = Cursor::new(reference.clone());
        let matches = BlockMatcher::new(&record)
            .unwrap()
            .match_reader(&mut cursor, &CancellationToken::new())
            .unwrap();
        assert_eq!(matches.len(), 8);
    }

    #[test]
    fn test_match_reader_cancelled() {
        let reference = random_bytes(4096);
        let record = record_for(&reference, 512);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut matcher = BlockMatcher::new(&record).unwrap();
        let result = matcher.match_reader(&mut Cursor::new(reference), &cancel);
        assert!(matches!(result, Err(DeltaError::Cancelled)));
        assert_eq!(matcher.scanned_bytes(), 0);
    }

    #[test]
    fn test_match_reader_propagates_io_error() {
        /// Yields `data` once, then fails
        struct FailingReader {
            data: Option<Vec<u8>>,
        }

        impl Read for FailingReader {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                match self.data.take() {
                    Some(data) => {
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                        Ok(n)
                    }
                    None => Err(std::io::Error::new(ErrorKind::BrokenPipe, "gone")),
                }
            }
        }

        let reference = random_bytes(1024);
        let record = record_for(&reference, 256);
        let mut reader = FailingReader {
            data: Some(reference[..256].to_vec()),
        };

        let mut matcher = BlockMatcher::new(&record).unwrap();
        let result = matcher.match_reader(&mut reader, &CancellationToken::new());
        match result {
            Err(DeltaError::Io(e)) => assert_eq!(e.kind(), ErrorKind::BrokenPipe),
            other => panic!("expected IO error, got {:?}", other),
        }
        assert_eq!(matcher.scanned_bytes(), 0);
        assert_eq!(matcher.matched_bytes(), 0);

        // The matcher is usable again after the failure
        let matches = matcher.match_bytes(&reference);
        assert_eq!(matches.len(), 4);
    }
}
