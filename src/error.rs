//! Error types for the Vyra assistant

use thiserror::Error;

/// Result type alias for Vyra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Vyra assistant
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Rejected settings value (e.g. a non-positive speech rate)
    #[error("invalid setting {key}: {reason}")]
    InvalidSetting {
        /// Settings key that was being written
        key: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Settings store error
    #[error("settings error: {0}")]
    Settings(String),

    /// Speech output error
    #[error("speech error: {0}")]
    Speech(String),

    /// Unrecognized console command
    #[error("invalid command: {0}")]
    Command(String),

    /// Side effect (URL opening) error
    #[error("side effect error: {0}")]
    SideEffect(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
