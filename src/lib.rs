pub mod metrics;
pub mod partition;
pub mod reconstruct;
pub mod sync;
