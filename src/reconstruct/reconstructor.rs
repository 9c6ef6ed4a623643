use crate::metrics;
use crate::partition::{ByteRange, RangeState, SharedRangeTracker};
use crate::reconstruct::error::{ReconstructError, ReconstructResult};
use crate::sync::{FingerprintRecord, MatchInfo};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of one reconstruction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconstructReport {
    /// Matches whose bytes were copied
    pub matches_applied: usize,
    pub bytes_copied: u64,
    /// Run stopped early on request
    pub cancelled: bool,
}

/// Copies matched blocks into a destination file
///
/// Single-threaded; run one per file transfer. Cancellation is checked once
/// per match. An I/O error aborts the run and leaves the destination
/// partially written; the tracker only ever marks bytes that were written.
#[derive(Debug, Clone)]
pub struct FileReconstructor {
    block_length: u32,
    cancel: CancellationToken,
}

impl FileReconstructor {
    pub fn new(block_length: u32) -> ReconstructResult<Self> {
        if block_length == 0 {
            return Err(ReconstructError::InvalidBlockLength(block_length));
        }
        Ok(Self {
            block_length,
            cancel: CancellationToken::new(),
        })
    }

    /// Reconstructor for the reference stream described by `record`
    pub fn for_record(record: &FingerprintRecord) -> ReconstructResult<Self> {
        Self::new(record.block_length)
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Apply `matches` in order.
    ///
    /// `source` is the stream the matches were found in; `destination` is
    /// the file being assembled, whose length is `tracker.length()`.
    /// `progress` receives the percentage of matches processed.
    pub fn run<S, D, P>(
        &self,
        matches: &[MatchInfo],
        source: &mut S,
        destination: &mut D,
        tracker: &SharedRangeTracker,
        mut progress: P,
    ) -> ReconstructResult<ReconstructReport>
    where
        S: Read + Seek,
        D: Write + Seek,
        P: FnMut(f64),
    {
        let started = Instant::now();
        let block_length = self.block_length as u64;
        let source_len = source.seek(SeekFrom::End(0))?;
        let destination_len = tracker.length();

        let mut report = ReconstructReport::default();
        let mut buffer = vec![0u8; self.block_length as usize];

        for (i, m) in matches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(
                    applied = report.matches_applied,
                    total = matches.len(),
                    "Reconstruction cancelled"
                );
                metrics::record_reconstruction_cancelled();
                report.cancelled = true;
                break;
            }

            let target_start = m.block.index * block_length;
            let len = block_length
                .min(source_len.saturating_sub(m.position))
                .min(destination_len.saturating_sub(target_start));

            if len == 0 {
                tracing::warn!(
                    block = m.block.index,
                    position = m.position,
                    "Match lies outside source or destination, skipped"
                );
            } else {
                if len < block_length && target_start + len < destination_len {
                    tracing::warn!(
                        block = m.block.index,
                        position = m.position,
                        copied = len,
                        "Match truncated by end of source"
                    );
                }

                let chunk = &mut buffer[..len as usize];
                source.seek(SeekFrom::Start(m.position))?;
                source.read_exact(chunk)?;
                destination.seek(SeekFrom::Start(target_start))?;
                destination.write_all(chunk)?;

                tracker.insert(
                    ByteRange::by_length(target_start, len),
                    RangeState::Available,
                )?;
                report.matches_applied += 1;
                report.bytes_copied += len;
            }

            progress((i + 1) as f64 / matches.len() as f64 * 100.0);
        }

        destination.flush()?;

        tracing::debug!(
            applied = report.matches_applied,
            bytes = report.bytes_copied,
            completed = tracker.is_completed(),
            "Reconstruction finished"
        );
        metrics::record_reconstruction(report.bytes_copied, started.elapsed());

        Ok(report)
    }

    /// Open both files and run the copy on the blocking thread pool.
    ///
    /// The destination is created if missing and sized to `tracker.length()`;
    /// existing content outside matched blocks is left alone.
    pub async fn reconstruct_file(
        &self,
        matches: Vec<MatchInfo>,
        source_path: PathBuf,
        destination_path: PathBuf,
        tracker: SharedRangeTracker,
    ) -> ReconstructResult<ReconstructReport> {
        let reconstructor = self.clone();

        tokio::task::spawn_blocking(move || {
            let mut source = File::open(&source_path)?;
            let mut destination = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&destination_path)?;
            destination.set_len(tracker.length())?;

            reconstructor.run(&matches, &mut source, &mut destination, &tracker, |_| {})
        })
        .await
        .map_err(|e| ReconstructError::Join(e.to_string()))?
    }
}
