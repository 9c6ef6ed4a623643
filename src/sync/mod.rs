//! Delta synchronization module
//!
//! Fingerprints a reference stream into fixed-size blocks and finds those
//! blocks, at any byte offset, in another stream. Weak rolling checksums
//! select candidates; strong digests confirm them.

pub mod digest;
pub mod error;
pub mod matcher;
pub mod ring_buffer;
pub mod rolling_hash;
pub mod signature;
pub mod types;

pub use digest::{DigestAlgorithm, StrongHasher};
pub use error::{DeltaError, DeltaResult};
pub use matcher::BlockMatcher;
pub use ring_buffer::RingBuffer;
pub use rolling_hash::{RollingAdler32, RollingChecksum};
pub use signature::BlockFingerprintBuilder;
pub use types::{BlockFingerprint, DeltaConfig, FingerprintRecord, MatchInfo, DEFAULT_BLOCK_LENGTH};
