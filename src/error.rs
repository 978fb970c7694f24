//! Error types shared by the codec, the backing stores and the facade.
//!
//! Malformed and expired records are not errors: they resolve to "absent"
//! inside the facade. Everything here comes from the backing store (or from
//! serializing a caller's value) and is handed back to the caller unchanged.

use thiserror::Error;

/// Errors surfaced by storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the persistent store failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to or from JSON
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store would grow past its configured byte quota
    #[error("quota exceeded: {needed} bytes needed (quota: {quota})")]
    QuotaExceeded { needed: usize, quota: usize },

    /// A thread panicked while holding the store lock
    #[error("store lock poisoned")]
    Poisoned,
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}
