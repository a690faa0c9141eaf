//! Cache errors

use thiserror::Error;

/// Errors raised by cache stores
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    /// A value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
