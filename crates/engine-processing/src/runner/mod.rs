use crate::{
    error::JobError,
    retry::classify_sink_error,
    runner::{journal::Journal, reader::ChunkReader},
    transform::{Transformer, history::StoreHistoryTransformer},
};
use connectors::sql::base::{destination::HistoryWriter, source::PagedSource};
use engine_config::{
    config::DEFAULT_JOB_NAME,
    settings::{JobSettings, validated::ValidatedSettings, validator::SettingsValidator},
};
use engine_core::{
    connectors::{sink::BulkSink, source::PageCursor},
    metrics::Metrics,
    state::{StateStore, models::Checkpoint},
};
use model::{
    entities::store::Store,
    job::{
        parameters::{JobParameters, REQUIRED_KEYS},
        report::{ChunkFailure, JobReport},
        status::JobStatus,
    },
    pagination::cursor::Cursor,
    records::chunk::Chunk,
};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod journal;
mod reader;

/// Result of one job execution: the report plus, for `FAILED`, the cause.
#[derive(Debug)]
pub struct JobExecution {
    pub run_id: String,
    pub report: JobReport,
    pub error: Option<JobError>,
}

impl JobExecution {
    pub fn status(&self) -> JobStatus {
        self.report.status
    }
}

/// Everything the loop needs once configuration has been checked.
struct Prepared {
    settings: ValidatedSettings,
    reader: ChunkReader,
    start: Cursor,
}

/// Drives source pages through the transformer into the sink, one committed
/// chunk at a time.
///
/// A chunk is read, transformed and flushed before the next one is pulled.
/// The first chunk that cannot be committed ends the job as `FAILED`; chunks
/// committed before it stay committed.
pub struct ChunkedJobRunner {
    job_name: String,
    run_id: String,
    params: JobParameters,
    settings: JobSettings,
    source: Arc<dyn PagedSource>,
    writer: Arc<dyn HistoryWriter>,
    transformer: Arc<dyn Transformer>,
    state: Option<Arc<dyn StateStore>>,
    resume: Option<Checkpoint>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl ChunkedJobRunner {
    pub fn new(
        source: Arc<dyn PagedSource>,
        writer: Arc<dyn HistoryWriter>,
        params: JobParameters,
        settings: JobSettings,
    ) -> Self {
        ChunkedJobRunner {
            job_name: DEFAULT_JOB_NAME.to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            params,
            settings,
            source,
            writer,
            transformer: Arc::new(StoreHistoryTransformer),
            state: None,
            resume: None,
            metrics: Metrics::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_job_name(mut self, job_name: &str) -> Self {
        self.job_name = job_name.to_string();
        self
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Continues after the cursor of an earlier checkpoint of this job.
    /// Takes precedence over the `resumeAfter` parameter.
    pub fn resume_from(mut self, checkpoint: Checkpoint) -> Self {
        self.resume = Some(checkpoint);
        self
    }

    /// Fingerprint of the job parameters; the key of its checkpoint.
    pub fn job_id(&self) -> String {
        self.params.fingerprint(&self.job_name)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn run(self) -> JobExecution {
        let job_id = self.job_id();
        let mut report = JobReport::new(&job_id, Cursor::None);

        let error = match self.prepare() {
            Ok(prepared) => {
                report.last_committed = prepared.start;
                let journal = self.state.as_ref().map(|store| {
                    Journal::new(
                        store.clone(),
                        &job_id,
                        &self.run_id,
                        prepared.settings.heartbeat_interval,
                        self.resume.as_ref(),
                    )
                });

                let result = self.drive(prepared, journal.as_ref(), &mut report).await;
                let error = result.err();
                if let Some(journal) = &journal {
                    journal.finish(&report, error.as_ref()).await;
                }
                error
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "Job rejected before start");
                self.metrics.increment_failures(1);
                if let Err(e) = transition(&mut report, JobStatus::Failed) {
                    warn!(error = %e, "Unexpected status on rejection");
                }
                Some(err)
            }
        };

        info!(
            job_id = %job_id,
            run_id = %self.run_id,
            status = %report.status,
            chunks = report.chunks,
            records_read = report.records_read,
            records_written = report.records_written,
            skipped = report.skipped,
            cursor = %report.last_committed,
            "Job finished"
        );

        JobExecution {
            run_id: self.run_id,
            report,
            error,
        }
    }

    /// Validates settings and parameters and opens the cursor. Touches
    /// neither the source nor the sink.
    fn prepare(&self) -> Result<Prepared, JobError> {
        let settings = SettingsValidator::validate(&self.settings)?;
        self.params.validate(REQUIRED_KEYS)?;
        let predicate = self.params.predicate()?;

        let start = match &self.resume {
            Some(cp) => cp.cursor,
            None => self
                .params
                .resume_after()?
                .map(Cursor::after)
                .unwrap_or_default(),
        };

        let mut cursor = PageCursor::open(
            self.source.clone(),
            predicate,
            settings.chunk_size,
            start,
        )?;
        if let Some(limit) = settings.fetch_timeout {
            cursor = cursor.with_timeout(limit);
        }

        let reader = ChunkReader::new(cursor, settings.chunk_size);
        Ok(Prepared {
            settings,
            reader,
            start,
        })
    }

    async fn drive(
        &self,
        prepared: Prepared,
        journal: Option<&Journal>,
        report: &mut JobReport,
    ) -> Result<(), JobError> {
        let Prepared {
            settings,
            mut reader,
            start,
        } = prepared;

        transition(report, JobStatus::Running)?;
        if let Some(journal) = journal
            && let Err(e) = journal.start(start).await
        {
            let err = JobError::from(e);
            self.fail(report, 1, start, 0, 0, &err)?;
            return Err(err);
        }
        info!(
            job_id = %report.job_id,
            run_id = %self.run_id,
            chunk_size = settings.chunk_size,
            cursor = %start,
            transformer = self.transformer.name(),
            "Job started"
        );

        let mut sink = BulkSink::new(self.writer.clone()).with_capacity(settings.chunk_size);
        if let Some(limit) = settings.flush_timeout {
            sink = sink.with_timeout(limit);
        }

        let mut seq = 0u64;
        loop {
            if reader.is_drained() {
                break;
            }
            if self.cancel.is_cancelled() {
                info!(job_id = %report.job_id, chunks = report.chunks, "Stop requested");
                return transition(report, JobStatus::Stopped);
            }

            seq += 1;
            let chunk_start = report.last_committed;
            let start_offset = report.records_read;
            let started = Instant::now();

            let pages_before = reader.pages_fetched();
            let stores = reader.next_chunk().await;
            self.metrics
                .increment_pages(reader.pages_fetched() - pages_before);
            let stores = match stores {
                Ok(stores) => stores,
                Err(e) => {
                    let err = JobError::from(e);
                    self.fail(report, seq, chunk_start, start_offset, 0, &err)?;
                    return Err(err);
                }
            };
            if stores.is_empty() {
                break;
            }
            report.records_read += stores.len() as u64;
            self.metrics.increment_read(stores.len() as u64);

            let chunk = match self.fill(&mut sink, &stores, seq, chunk_start, start_offset) {
                Ok(chunk) => chunk,
                Err(err) => {
                    let pending = sink.discard();
                    self.fail(report, seq, chunk_start, start_offset, pending, &err)?;
                    return Err(err);
                }
            };

            if let Err(err) = self.flush(&mut sink, &settings).await {
                let pending = sink.discard();
                self.fail(report, seq, chunk_start, start_offset, pending, &err)?;
                return Err(err);
            }

            report.chunks += 1;
            report.records_written += chunk.row_count() as u64;
            report.skipped += chunk.skipped() as u64;
            report.last_committed = chunk.next;
            self.metrics.increment_chunks(1);
            self.metrics.increment_written(chunk.row_count() as u64);
            self.metrics.increment_skipped(chunk.skipped() as u64);
            self.metrics.increment_bytes(chunk.size_bytes as u64);

            info!(
                chunk_seq = chunk.seq,
                rows = chunk.row_count(),
                skipped = chunk.skipped(),
                cursor = %chunk.next,
                checksum = chunk.manifest.checksum_xxh3,
                duration_ms = started.elapsed().as_millis(),
                "Committed chunk"
            );

            if let Some(journal) = journal {
                if let Err(e) = journal.commit(&chunk, report).await {
                    let err = JobError::from(e);
                    let offset = report.records_read;
                    self.fail(report, seq + 1, chunk.next, offset, 0, &err)?;
                    return Err(err);
                }
                journal.heartbeat(report.chunks).await;
            }
        }

        transition(report, JobStatus::Completed)
    }

    /// Transforms one chunk of stores into the sink.
    fn fill(
        &self,
        sink: &mut BulkSink,
        stores: &[Store],
        seq: u64,
        cursor: Cursor,
        start_offset: u64,
    ) -> Result<Chunk, JobError> {
        for store in stores {
            if let Some(row) = self.transformer.transform(store)? {
                sink.add(row);
            }
        }

        // Keyset order: the chunk ends at its highest id.
        let next = stores
            .last()
            .map(|store| Cursor::after(store.id))
            .unwrap_or(cursor);
        Ok(Chunk::seal(
            seq,
            cursor,
            next,
            start_offset,
            stores.len(),
            sink.pending(),
        ))
    }

    async fn flush(
        &self,
        sink: &mut BulkSink,
        settings: &ValidatedSettings,
    ) -> Result<usize, JobError> {
        if !settings.retries_enabled() {
            return Ok(sink.flush().await?);
        }

        let metrics = self.metrics.clone();
        let written = sink
            .flush_with_retry(&settings.retry, classify_sink_error, |attempt, err| {
                metrics.increment_retries(1);
                warn!(attempt, rows = err.count(), error = %err, "Retrying chunk flush");
            })
            .await?;
        Ok(written)
    }

    fn fail(
        &self,
        report: &mut JobReport,
        seq: u64,
        start_cursor: Cursor,
        start_offset: u64,
        pending_rows: usize,
        err: &JobError,
    ) -> Result<(), JobError> {
        error!(
            chunk_seq = seq,
            cursor = %start_cursor,
            offset = start_offset,
            rows = pending_rows,
            error = %err,
            "Chunk failed"
        );
        self.metrics.increment_failures(1);
        report.failure = Some(ChunkFailure {
            chunk_seq: seq,
            start_cursor,
            start_offset,
            pending_rows,
            error: err.to_string(),
        });
        transition(report, JobStatus::Failed)
    }
}

fn transition(report: &mut JobReport, next: JobStatus) -> Result<(), JobError> {
    if !report.status.can_transition_to(next) {
        return Err(JobError::IllegalTransition {
            from: report.status,
            to: next,
        });
    }
    report.status = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::error::TransformError;
    use async_trait::async_trait;
    use connectors::{
        memory::{InjectedFailure, MemoryStore},
        sql::base::error::DbError,
    };
    use engine_core::{error::StateStoreError, state::models::WalEntry};
    use model::{
        entities::history::StoreHistory,
        pagination::page::{FetchResult, PageRequest},
    };
    use std::time::Duration;

    fn params(address: &str) -> JobParameters {
        JobParameters::builder()
            .add_string("address", address)
            .to_job_parameters()
    }

    fn seoul(n: i64) -> MemoryStore {
        MemoryStore::with_stores(
            (1..=n)
                .map(|id| Store::new(id, &format!("s{id}"), &format!("Seoul a{id}")))
                .collect(),
        )
    }

    fn runner(store: &MemoryStore, chunk_size: i64) -> ChunkedJobRunner {
        ChunkedJobRunner::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            params("Seoul"),
            JobSettings::default().with_chunk_size(chunk_size),
        )
    }

    #[tokio::test]
    async fn partial_last_chunk_is_committed() {
        let store = seoul(5);
        let exec = runner(&store, 2).run().await;

        assert_eq!(exec.status(), JobStatus::Completed);
        assert!(exec.error.is_none());
        assert_eq!(exec.report.chunks, 3);
        assert_eq!(exec.report.records_written, 5);
        assert_eq!(exec.report.last_committed, Cursor::after(5));
        assert_eq!(store.write_calls().await, 3);
    }

    #[tokio::test]
    async fn zero_chunk_size_is_rejected_without_io() {
        let store = seoul(3);
        let exec = runner(&store, 0).run().await;

        assert_eq!(exec.status(), JobStatus::Failed);
        assert!(matches!(exec.error, Some(JobError::InvalidChunkSize(0))));
        assert_eq!(store.read_queries().await, 0);
        assert_eq!(store.write_calls().await, 0);
    }

    #[tokio::test]
    async fn second_flush_failure_keeps_first_chunk() {
        let store = seoul(4);
        store.fail_write_call(2, InjectedFailure::Fatal).await;
        let exec = runner(&store, 2).run().await;

        assert_eq!(exec.status(), JobStatus::Failed);
        assert!(matches!(
            exec.error,
            Some(JobError::WriteFailed { count: 2, .. })
        ));
        let failure = exec.report.failure.unwrap();
        assert_eq!(failure.chunk_seq, 2);
        assert_eq!(failure.start_cursor, Cursor::after(2));
        assert_eq!(failure.start_offset, 2);
        assert_eq!(failure.pending_rows, 2);
        assert_eq!(exec.report.last_committed, Cursor::after(2));
        assert_eq!(store.history().await.len(), 2);
    }

    struct RejectOdd;

    impl Transformer for RejectOdd {
        fn transform(&self, store: &Store) -> Result<Option<StoreHistory>, TransformError> {
            if store.id == 3 {
                return Err(TransformError::Transformation {
                    store_id: store.id,
                    message: "unsupported".into(),
                });
            }
            Ok((store.id % 2 == 0).then(|| StoreHistoryTransformer::snapshot(store)))
        }
    }

    #[tokio::test]
    async fn skipped_records_are_not_written_and_errors_abort_the_chunk() {
        let store = seoul(4);
        let exec = runner(&store, 2)
            .with_transformer(Arc::new(RejectOdd))
            .run()
            .await;

        assert_eq!(exec.status(), JobStatus::Failed);
        assert!(matches!(exec.error, Some(JobError::TransformError(_))));
        assert_eq!(exec.report.chunks, 1);
        assert_eq!(exec.report.records_written, 1);
        assert_eq!(exec.report.skipped, 1);
        // The failed chunk never reached the writer.
        assert_eq!(store.write_calls().await, 1);
    }

    struct BrokenWal;

    #[async_trait]
    impl StateStore for BrokenWal {
        async fn save_checkpoint(&self, _cp: &Checkpoint) -> Result<(), StateStoreError> {
            Ok(())
        }

        async fn load_checkpoint(
            &self,
            _job_id: &str,
        ) -> Result<Option<Checkpoint>, StateStoreError> {
            Ok(None)
        }

        async fn append_wal(&self, _entry: &WalEntry) -> Result<(), StateStoreError> {
            Err(StateStoreError::Encoding(Box::new(
                bincode::ErrorKind::Custom("disk full".into()),
            )))
        }

        async fn iter_wal(&self, _job_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
            Ok(Vec::new())
        }

        async fn prune_wal(&self, _job_id: &str, _keep: &str) -> Result<usize, StateStoreError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn unwritable_journal_fails_the_job_before_reading() {
        let store = seoul(1);
        let exec = runner(&store, 10).with_state(Arc::new(BrokenWal)).run().await;

        assert_eq!(exec.status(), JobStatus::Failed);
        assert!(matches!(exec.error, Some(JobError::StateStore(_))));
        let failure = exec.report.failure.unwrap();
        assert_eq!(failure.chunk_seq, 1);
        assert_eq!(failure.start_cursor, Cursor::None);
        assert_eq!(store.read_queries().await, 0);
        assert_eq!(store.write_calls().await, 0);
    }

    struct Stalled;

    #[async_trait]
    impl PagedSource for Stalled {
        async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(FetchResult::from_page(Vec::new(), request.limit))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn slow_source_fails_with_source_unavailable() {
        let store = MemoryStore::new();
        let settings = JobSettings {
            fetch_timeout_ms: 50,
            ..JobSettings::default()
        };
        let exec = ChunkedJobRunner::new(
            Arc::new(Stalled),
            Arc::new(store.clone()),
            params("Seoul"),
            settings,
        )
        .run()
        .await;

        assert_eq!(exec.status(), JobStatus::Failed);
        assert!(matches!(exec.error, Some(JobError::SourceUnavailable(_))));
        assert_eq!(exec.report.chunks, 0);
        assert_eq!(exec.report.failure.unwrap().chunk_seq, 1);
        assert_eq!(store.write_calls().await, 0);
    }

    #[test]
    fn terminal_status_cannot_be_left() {
        let mut report = JobReport::new("job", Cursor::None);
        transition(&mut report, JobStatus::Running).unwrap();
        transition(&mut report, JobStatus::Completed).unwrap();
        assert!(matches!(
            transition(&mut report, JobStatus::Running),
            Err(JobError::IllegalTransition { .. })
        ));
    }
}
