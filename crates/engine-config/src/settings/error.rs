use thiserror::Error;

/// Errors raised when validating job settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    /// Chunks must hold at least one record.
    #[error("Invalid chunk size {0}: must be at least 1")]
    InvalidChunkSize(i64),

    #[error("Invalid retry settings: {0}")]
    InvalidRetry(String),
}
