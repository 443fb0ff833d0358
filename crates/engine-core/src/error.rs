use connectors::sql::base::error::DbError;
use thiserror::Error;

/// Failures of the read side, as seen by the engine.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The store could not be reached or did not answer in time.
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// The predicate or the query built from it was rejected.
    #[error("Query error: {0}")]
    Query(String),
}

/// Failures of a chunk flush. The sink buffer is untouched when one of these
/// is returned.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write {count} records: {source}")]
    WriteFailed {
        count: usize,
        #[source]
        source: DbError,
    },

    #[error("Writing {count} records timed out after {elapsed_ms} ms")]
    Timeout { count: usize, elapsed_ms: u128 },
}

impl SinkError {
    /// Number of records the failed flush carried.
    pub fn count(&self) -> usize {
        match self {
            SinkError::WriteFailed { count, .. } | SinkError::Timeout { count, .. } => *count,
        }
    }
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("State storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to encode or decode state: {0}")]
    Encoding(#[from] bincode::Error),
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to read WAL: {0}")]
    Wal(String),

    #[error("Failed to load checkpoint: {0}")]
    LoadCheckpoint(String),
}
