//! Error types for the `steppet` binary.
//!
//! [`CliError`] is the top-level error type that wraps every failure mode
//! the host can hit before or after driving the state engine. The engine
//! itself never fails once a session is open.

/// Top-level error for the `steppet` binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: steppet_core::config::ConfigError,
    },

    /// An administrative store operation failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: steppet_store::StoreError,
    },

    /// Output could not be serialized.
    #[error("output error: {source}")]
    Output {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The command-line input was not a usable step reading.
    #[error("not a step reading: {input:?}")]
    InvalidReading {
        /// The rejected input.
        input: String,
    },
}
