//! Error types for the storage layer.
//!
//! All errors are propagated via [`StoreError`]. Callers in the state engine
//! treat every variant as a soft failure: they log it and carry on with the
//! in-memory record.

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("storage I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The key cannot be mapped onto the backing store.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The store refuses writes (full, locked, or read-only).
    #[error("store is read-only, cannot write {key}")]
    ReadOnly {
        /// The key that could not be written.
        key: String,
    },
}
