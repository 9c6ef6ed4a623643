//! Metrics and observability module
//!
//! Records counters through the `metrics` facade; installing an exporter is
//! up to the embedding application.
//!
//! Key metrics exposed:
//! - Blocks and bytes fingerprinted
//! - Bytes scanned and matches found
//! - Bytes copied into reconstructed files and time spent doing it

pub mod recorder;

pub use recorder::{
    init_metrics, record_fingerprints_built, record_reconstruction,
    record_reconstruction_cancelled, record_scan,
};
