//! Range state tracking for files under reconstruction
//!
//! Records which byte ranges of a destination file are still needed, have
//! been requested, or are already in place. Storage grows with the number of
//! state changes along the file, not with its size.

pub mod error;
pub mod tracker;
pub mod types;

pub use error::{PartitionError, PartitionResult};
pub use tracker::{RangeStateTracker, SharedRangeTracker};
pub use types::{ByteRange, RangeState};
