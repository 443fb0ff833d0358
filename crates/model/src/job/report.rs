use crate::{job::status::JobStatus, pagination::cursor::Cursor};
use serde::{Deserialize, Serialize};

/// Where and why a chunk could not be committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_seq: u64,
    /// Cursor the failed chunk started from; relaunching from here redoes
    /// exactly that chunk.
    pub start_cursor: Cursor,
    /// Number of source records read before the failed chunk.
    pub start_offset: u64,
    /// Rows that were pending in the sink when the flush failed.
    pub pending_rows: usize,
    pub error: String,
}

/// Outcome of one job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub status: JobStatus,
    pub chunks: u64,
    pub records_read: u64,
    pub records_written: u64,
    /// Records the transformer chose not to emit.
    pub skipped: u64,
    pub last_committed: Cursor,
    pub failure: Option<ChunkFailure>,
}

impl JobReport {
    pub fn new(job_id: &str, start: Cursor) -> Self {
        JobReport {
            job_id: job_id.to_string(),
            status: JobStatus::Initialized,
            chunks: 0,
            records_read: 0,
            records_written: 0,
            skipped: 0,
            last_committed: start,
            failure: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
