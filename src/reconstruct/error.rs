use crate::partition::PartitionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Range tracking error: {0}")]
    Partition(#[from] PartitionError),

    #[error("Invalid block length: {0} (must be greater than zero)")]
    InvalidBlockLength(u32),

    #[error("Reconstruction task failed: {0}")]
    Join(String),
}

pub type ReconstructResult<T> = Result<T, ReconstructError>;
