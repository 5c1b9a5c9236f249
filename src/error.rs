//! Error types for the cache library
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache operations.
///
/// Loader failures are the only errors a read can surface; everything the
/// cache can recover from internally (stale fingerprints, capacity pressure)
/// never reaches the caller as an error.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The caller-supplied loader failed; the original error is the source
    #[error("Loader failed for key: {key}")]
    Loader {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Rejected configuration values
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
