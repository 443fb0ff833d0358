use crate::error::JobError;
use engine_core::{
    error::StateStoreError,
    state::{
        StateStore,
        models::{Checkpoint, CheckpointStage, WalEntry},
    },
};
use model::{
    job::{report::JobReport, status::JobStatus},
    pagination::cursor::Cursor,
    records::chunk::{Chunk, Manifest},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Writes the WAL and checkpoints of one job execution.
pub(crate) struct Journal {
    store: Arc<dyn StateStore>,
    job_id: String,
    run_id: String,
    heartbeat_interval: usize,
    // Totals carried over from the checkpoint this run resumed from.
    base_rows: u64,
    base_read: u64,
}

impl Journal {
    pub(crate) fn new(
        store: Arc<dyn StateStore>,
        job_id: &str,
        run_id: &str,
        heartbeat_interval: usize,
        resumed: Option<&Checkpoint>,
    ) -> Self {
        Journal {
            store,
            job_id: job_id.to_string(),
            run_id: run_id.to_string(),
            heartbeat_interval,
            base_rows: resumed.map_or(0, |cp| cp.rows_done),
            base_read: resumed.map_or(0, |cp| cp.records_read),
        }
    }

    pub(crate) async fn start(&self, resume_from: Cursor) -> Result<(), StateStoreError> {
        self.store
            .append_wal(&WalEntry::JobStart {
                job_id: self.job_id.clone(),
                run_id: self.run_id.clone(),
                resume_from,
            })
            .await
    }

    /// Records a flushed chunk. Must only be called after the flush succeeded.
    pub(crate) async fn commit(
        &self,
        chunk: &Chunk,
        report: &JobReport,
    ) -> Result<(), StateStoreError> {
        self.store
            .append_wal(&WalEntry::ChunkCommit {
                job_id: self.job_id.clone(),
                run_id: self.run_id.clone(),
                chunk_seq: chunk.seq,
                rows: chunk.row_count() as u64,
                checksum: chunk.manifest.checksum_xxh3,
                next: chunk.next,
            })
            .await?;

        self.store
            .save_checkpoint(&self.checkpoint(
                CheckpointStage::Committed,
                chunk.seq,
                chunk.next,
                chunk.manifest,
                report,
            ))
            .await?;

        debug!(chunk_seq = chunk.seq, cursor = %chunk.next, "Checkpoint saved");
        Ok(())
    }

    pub(crate) async fn heartbeat(&self, chunks: u64) {
        if self.heartbeat_interval == 0 || chunks % self.heartbeat_interval as u64 != 0 {
            return;
        }

        let entry = WalEntry::Heartbeat {
            job_id: self.job_id.clone(),
            run_id: self.run_id.clone(),
            chunk_seq: chunks,
            at: chrono::Utc::now(),
        };
        if let Err(e) = self.store.append_wal(&entry).await {
            warn!(job_id = %self.job_id, error = %e, "Failed to record heartbeat");
        }
    }

    /// Records the terminal status. Failures here are logged, not raised: the
    /// chunks are already committed and the report is still accurate.
    ///
    /// A completed run also drops the WAL of earlier runs of the same job.
    pub(crate) async fn finish(&self, report: &JobReport, error: Option<&JobError>) {
        let job_id = self.job_id.clone();
        let run_id = self.run_id.clone();

        let result = match report.status {
            JobStatus::Completed => {
                let done = self.checkpoint(
                    CheckpointStage::Done,
                    report.chunks,
                    report.last_committed,
                    Manifest::default(),
                    report,
                );
                match self
                    .store
                    .append_wal(&WalEntry::JobDone { job_id, run_id })
                    .await
                {
                    Ok(()) => match self.store.save_checkpoint(&done).await {
                        Ok(()) => self.prune().await,
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(e),
                }
            }
            JobStatus::Stopped => {
                self.store
                    .append_wal(&WalEntry::JobStopped { job_id, run_id })
                    .await
            }
            JobStatus::Failed => {
                let error = error.map_or_else(|| "unknown failure".to_string(), |e| e.to_string());
                self.store
                    .append_wal(&WalEntry::JobFailed {
                        job_id,
                        run_id,
                        chunk_seq: report.failure.as_ref().map_or(report.chunks, |f| f.chunk_seq),
                        error,
                    })
                    .await
            }
            JobStatus::Initialized | JobStatus::Running => Ok(()),
        };

        if let Err(e) = result {
            warn!(job_id = %self.job_id, error = %e, "Failed to record job outcome");
        }
    }

    async fn prune(&self) -> Result<(), StateStoreError> {
        let removed = self.store.prune_wal(&self.job_id, &self.run_id).await?;
        if removed > 0 {
            debug!(job_id = %self.job_id, removed, "Pruned WAL of earlier runs");
        }
        Ok(())
    }

    fn checkpoint(
        &self,
        stage: CheckpointStage,
        chunk_seq: u64,
        cursor: Cursor,
        manifest: Manifest,
        report: &JobReport,
    ) -> Checkpoint {
        Checkpoint {
            job_id: self.job_id.clone(),
            run_id: self.run_id.clone(),
            stage,
            chunk_seq,
            cursor,
            rows_done: self.base_rows + report.records_written,
            records_read: self.base_read + report.records_read,
            manifest,
            updated_at: chrono::Utc::now(),
        }
    }
}
