//! File reconstruction from block matches
//!
//! Copies every matched block from the local file it was found in to its
//! place in the destination file and records the copied ranges as available.

pub mod error;
pub mod reconstructor;

pub use error::{ReconstructError, ReconstructResult};
pub use reconstructor::{FileReconstructor, ReconstructReport};
