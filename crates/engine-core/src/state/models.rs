use chrono::{DateTime, Utc};
use model::{pagination::cursor::Cursor, records::chunk::Manifest};
use serde::{Deserialize, Serialize};

/// How far a job got, as of its last checkpoint.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointStage {
    /// At least one chunk is committed and more may follow.
    Committed,
    /// The source was exhausted and every chunk is committed.
    Done,
}

impl CheckpointStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStage::Committed => "committed",
            CheckpointStage::Done => "done",
        }
    }
}

/// Last committed position of a job, keyed by the job fingerprint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub job_id: String,
    pub run_id: String,
    pub stage: CheckpointStage,
    pub chunk_seq: u64,
    pub cursor: Cursor,
    /// Rows written by the run chain that produced this checkpoint.
    pub rows_done: u64,
    pub records_read: u64,
    pub manifest: Manifest,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum WalEntry {
    JobStart {
        job_id: String,
        run_id: String,
        resume_from: Cursor,
    },
    ChunkCommit {
        job_id: String,
        run_id: String,
        chunk_seq: u64,
        rows: u64,
        checksum: u64,
        next: Cursor,
    },
    Heartbeat {
        job_id: String,
        run_id: String,
        chunk_seq: u64,
        at: DateTime<Utc>,
    },
    JobFailed {
        job_id: String,
        run_id: String,
        chunk_seq: u64,
        error: String,
    },
    JobStopped {
        job_id: String,
        run_id: String,
    },
    JobDone {
        job_id: String,
        run_id: String,
    },
}

impl WalEntry {
    pub fn job_id(&self) -> &str {
        match self {
            WalEntry::JobStart { job_id, .. } => job_id,
            WalEntry::ChunkCommit { job_id, .. } => job_id,
            WalEntry::Heartbeat { job_id, .. } => job_id,
            WalEntry::JobFailed { job_id, .. } => job_id,
            WalEntry::JobStopped { job_id, .. } => job_id,
            WalEntry::JobDone { job_id, .. } => job_id,
        }
    }

    pub fn run_id(&self) -> &str {
        match self {
            WalEntry::JobStart { run_id, .. } => run_id,
            WalEntry::ChunkCommit { run_id, .. } => run_id,
            WalEntry::Heartbeat { run_id, .. } => run_id,
            WalEntry::JobFailed { run_id, .. } => run_id,
            WalEntry::JobStopped { run_id, .. } => run_id,
            WalEntry::JobDone { run_id, .. } => run_id,
        }
    }
}
