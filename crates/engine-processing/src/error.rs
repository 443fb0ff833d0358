use crate::transform::error::TransformError;
use engine_config::settings::error::SettingsError;
use engine_core::error::{SinkError, SourceError, StateStoreError};
use model::job::{parameters::ParameterError, status::JobStatus};
use thiserror::Error;

/// Why a job execution ended in `FAILED`.
#[derive(Error, Debug)]
pub enum JobError {
    /// Chunk size zero or negative; raised before any I/O.
    #[error("Invalid chunk size {0}: must be at least 1")]
    InvalidChunkSize(i64),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid job parameters: {0}")]
    InvalidParameters(#[from] ParameterError),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Failed to write {count} records: {message}")]
    WriteFailed { count: usize, message: String },

    #[error(transparent)]
    TransformError(#[from] TransformError),

    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("Illegal job status transition {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },
}

impl From<SettingsError> for JobError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::InvalidChunkSize(size) => JobError::InvalidChunkSize(size),
            other => JobError::InvalidSettings(other.to_string()),
        }
    }
}

impl From<SourceError> for JobError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable(msg) => JobError::SourceUnavailable(msg),
            SourceError::Query(msg) => JobError::QueryError(msg),
        }
    }
}

impl From<SinkError> for JobError {
    fn from(err: SinkError) -> Self {
        JobError::WriteFailed {
            count: err.count(),
            message: err.to_string(),
        }
    }
}
