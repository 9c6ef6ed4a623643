use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Range {start}..{end} lies outside 0..{length}")]
    OutOfBounds { start: u64, end: u64, length: u64 },
}

pub type PartitionResult<T> = Result<T, PartitionError>;
