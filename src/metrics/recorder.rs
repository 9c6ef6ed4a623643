//! Metrics recorder for delta synchronization
//!
//! Records fingerprinting, matching and reconstruction activity.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    // Fingerprinting
    describe_counter!(
        "blockdelta_blocks_fingerprinted_total",
        "Total number of block fingerprints built"
    );
    describe_counter!(
        "blockdelta_bytes_fingerprinted_total",
        "Total bytes of reference streams fingerprinted"
    );

    // Matching
    describe_counter!(
        "blockdelta_bytes_scanned_total",
        "Total bytes scanned for matching blocks"
    );
    describe_counter!(
        "blockdelta_matches_total",
        "Total number of confirmed block matches"
    );
    describe_counter!(
        "blockdelta_bytes_matched_total",
        "Total scanned bytes covered by matches"
    );

    // Reconstruction
    describe_counter!(
        "blockdelta_bytes_reconstructed_total",
        "Total bytes copied into destination files from local matches"
    );
    describe_counter!(
        "blockdelta_reconstructions_cancelled_total",
        "Total number of reconstructions stopped by cancellation"
    );
    describe_histogram!(
        "blockdelta_reconstruct_duration_seconds",
        "Time spent applying a match list"
    );
}

/// Record a finished fingerprint record
pub fn record_fingerprints_built(blocks: usize, stream_length: u64) {
    counter!("blockdelta_blocks_fingerprinted_total").increment(blocks as u64);
    counter!("blockdelta_bytes_fingerprinted_total").increment(stream_length);
}

/// Record a finished scan
pub fn record_scan(scanned: u64, matches: usize, matched: u64) {
    counter!("blockdelta_bytes_scanned_total").increment(scanned);
    counter!("blockdelta_matches_total").increment(matches as u64);
    counter!("blockdelta_bytes_matched_total").increment(matched);
}

/// Record a finished (or stopped) reconstruction run
pub fn record_reconstruction(bytes_copied: u64, duration: Duration) {
    counter!("blockdelta_bytes_reconstructed_total").increment(bytes_copied);
    histogram!("blockdelta_reconstruct_duration_seconds").record(duration.as_secs_f64());
}

pub fn record_reconstruction_cancelled() {
    counter!("blockdelta_reconstructions_cancelled_total").increment(1);
}
