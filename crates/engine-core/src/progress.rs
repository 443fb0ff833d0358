use crate::{
    error::ProgressError,
    state::{
        StateStore,
        models::{CheckpointStage, WalEntry},
    },
};
use chrono::{DateTime, Utc};
use model::pagination::cursor::Cursor;
use serde::Serialize;
use std::{fmt, sync::Arc};

#[derive(Clone)]
pub struct ProgressService {
    pub store: Arc<dyn StateStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressStage {
    Idle,
    Running,
    Stopped,
    Done,
    Failed,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Idle => "Idle",
            ProgressStage::Running => "Running",
            ProgressStage::Stopped => "Stopped",
            ProgressStage::Done => "Done",
            ProgressStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressStatus {
    pub job_id: String,
    pub run_id: Option<String>,
    pub stage: ProgressStage,
    pub last_cursor: Cursor,
    pub chunks_committed: u64,
    pub rows_done: u64,
    pub last_error: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        ProgressService { store }
    }

    /// Derives the stage of the latest run of `job_id` from its WAL and
    /// checkpoint.
    pub async fn job_status(&self, job_id: &str) -> Result<ProgressStatus, ProgressError> {
        let wal_entries = self
            .store
            .iter_wal(job_id)
            .await
            .map_err(|e| ProgressError::Wal(e.to_string()))?;

        // Only the most recent run decides the stage.
        let latest_run = wal_entries
            .iter()
            .rev()
            .find_map(|entry| match entry {
                WalEntry::JobStart { run_id, .. } => Some(run_id.clone()),
                _ => None,
            });

        let mut stage = ProgressStage::Idle;
        let mut last_error = None;
        let mut last_heartbeat = None;

        for entry in wal_entries
            .iter()
            .filter(|e| latest_run.as_deref() == Some(e.run_id()))
        {
            match entry {
                WalEntry::JobStart { .. } | WalEntry::ChunkCommit { .. } => {
                    stage = ProgressStage::Running;
                }
                WalEntry::Heartbeat { at, .. } => {
                    last_heartbeat = Some(*at);
                }
                WalEntry::JobFailed { error, .. } => {
                    stage = ProgressStage::Failed;
                    last_error = Some(error.clone());
                }
                WalEntry::JobStopped { .. } => stage = ProgressStage::Stopped,
                WalEntry::JobDone { .. } => stage = ProgressStage::Done,
            }
        }

        let checkpoint = self
            .store
            .load_checkpoint(job_id)
            .await
            .map_err(|err| ProgressError::LoadCheckpoint(err.to_string()))?;

        let (last_cursor, chunks_committed, rows_done) = match &checkpoint {
            Some(cp) => (cp.cursor, cp.chunk_seq, cp.rows_done),
            None => (Cursor::None, 0, 0),
        };

        // A checkpoint without a WAL trail still tells us the job made progress.
        if stage == ProgressStage::Idle
            && let Some(cp) = &checkpoint
        {
            stage = match cp.stage {
                CheckpointStage::Committed => ProgressStage::Running,
                CheckpointStage::Done => ProgressStage::Done,
            };
        }

        Ok(ProgressStatus {
            job_id: job_id.to_string(),
            run_id: latest_run,
            stage,
            last_cursor,
            chunks_committed,
            rows_done,
            last_error,
            last_heartbeat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{models::Checkpoint, sled_store::SledStateStore};
    use model::records::chunk::Manifest;
    use tempfile::tempdir;

    const JOB_ID: &str = "job-0123456789abcdef";

    fn service() -> (tempfile::TempDir, Arc<dyn StateStore>, ProgressService) {
        let dir = tempdir().unwrap();
        let store: Arc<dyn StateStore> =
            Arc::new(SledStateStore::open(dir.path()).expect("open sled"));
        let service = ProgressService::new(store.clone());
        (dir, store, service)
    }

    fn start(run_id: &str) -> WalEntry {
        WalEntry::JobStart {
            job_id: JOB_ID.into(),
            run_id: run_id.into(),
            resume_from: Cursor::None,
        }
    }

    #[tokio::test]
    async fn unknown_job_is_idle() {
        let (_dir, _store, service) = service();
        let status = service.job_status(JOB_ID).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Idle);
        assert_eq!(status.last_cursor, Cursor::None);
        assert!(status.run_id.is_none());
    }

    #[tokio::test]
    async fn reports_running_job_with_checkpoint() {
        let (_dir, store, service) = service();

        store.append_wal(&start("run-1")).await.unwrap();
        store
            .append_wal(&WalEntry::Heartbeat {
                job_id: JOB_ID.into(),
                run_id: "run-1".into(),
                chunk_seq: 2,
                at: Utc::now(),
            })
            .await
            .unwrap();
        store
            .save_checkpoint(&Checkpoint {
                job_id: JOB_ID.into(),
                run_id: "run-1".into(),
                stage: CheckpointStage::Committed,
                chunk_seq: 2,
                cursor: Cursor::after(40),
                rows_done: 20,
                records_read: 20,
                manifest: Manifest::default(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let status = service.job_status(JOB_ID).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Running);
        assert_eq!(status.rows_done, 20);
        assert_eq!(status.chunks_committed, 2);
        assert_eq!(status.last_cursor, Cursor::after(40));
        assert!(status.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn latest_run_decides_the_stage() {
        let (_dir, store, service) = service();

        store.append_wal(&start("run-1")).await.unwrap();
        store
            .append_wal(&WalEntry::JobFailed {
                job_id: JOB_ID.into(),
                run_id: "run-1".into(),
                chunk_seq: 3,
                error: "boom".into(),
            })
            .await
            .unwrap();

        let status = service.job_status(JOB_ID).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Failed);
        assert_eq!(status.last_error.as_deref(), Some("boom"));

        store.append_wal(&start("run-2")).await.unwrap();
        store
            .append_wal(&WalEntry::JobDone {
                job_id: JOB_ID.into(),
                run_id: "run-2".into(),
            })
            .await
            .unwrap();

        let status = service.job_status(JOB_ID).await.unwrap();
        assert_eq!(status.stage, ProgressStage::Done);
        assert_eq!(status.run_id.as_deref(), Some("run-2"));
        assert!(status.last_error.is_none());
    }
}
