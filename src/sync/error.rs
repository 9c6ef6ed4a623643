use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported digest algorithm: {0}")]
    UnsupportedDigest(String),

    #[error("Invalid block length: {0} (must be greater than zero)")]
    InvalidBlockLength(u32),

    #[error("Record has {blocks} fingerprints, expected {expected} for its stream length")]
    InvalidRecord { blocks: usize, expected: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type DeltaResult<T> = Result<T, DeltaError>;
