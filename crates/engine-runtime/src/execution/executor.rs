use crate::{error::LaunchError, execution::factory};
use chrono::Utc;
use connectors::adapter::Adapter;
use engine_config::{config::JobConfig, report::summary::SummaryReport, settings::JobSettings};
use engine_core::{metrics::Metrics, state::StateStore};
use engine_processing::runner::ChunkedJobRunner;
use model::job::parameters::JobParameters;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Builds the adapter described by `config` and runs one job execution.
pub async fn launch(
    config: &JobConfig,
    params: JobParameters,
    state: Option<Arc<dyn StateStore>>,
    resume: bool,
    cancel: CancellationToken,
) -> Result<SummaryReport, LaunchError> {
    let adapter = factory::create_adapter(&config.source).await?;

    let mut launcher = JobLauncher::new(&config.job_name, adapter)
        .with_cancellation(cancel)
        .resume(resume);
    if let Some(state) = state {
        launcher = launcher.with_state(state);
    }

    launcher.launch(params, &config.settings).await
}

/// Runs job executions against one connected store.
pub struct JobLauncher {
    job_name: String,
    adapter: Adapter,
    state: Option<Arc<dyn StateStore>>,
    cancel: CancellationToken,
    resume: bool,
}

impl JobLauncher {
    pub fn new(job_name: &str, adapter: Adapter) -> Self {
        JobLauncher {
            job_name: job_name.to_string(),
            adapter,
            state: None,
            cancel: CancellationToken::new(),
            resume: false,
        }
    }

    pub fn with_state(mut self, state: Arc<dyn StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Continue from the job's last checkpoint instead of from the start.
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub async fn launch(
        &self,
        params: JobParameters,
        settings: &JobSettings,
    ) -> Result<SummaryReport, LaunchError> {
        let started_at = Utc::now();
        let metrics = Metrics::new();
        let parameters = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut runner = ChunkedJobRunner::new(
            self.adapter.source(),
            self.adapter.writer(),
            params,
            settings.clone(),
        )
        .with_job_name(&self.job_name)
        .with_metrics(metrics.clone())
        .with_cancellation(self.cancel.clone());

        let job_id = runner.job_id();
        let mut resumed_from = None;

        if let Some(state) = &self.state {
            runner = runner.with_state(state.clone());

            if self.resume {
                match state.load_checkpoint(&job_id).await? {
                    Some(cp) => {
                        info!(
                            job_id = %job_id,
                            cursor = %cp.cursor,
                            rows_done = cp.rows_done,
                            "Resuming from checkpoint"
                        );
                        resumed_from = Some(cp.cursor.to_string());
                        runner = runner.resume_from(cp);
                    }
                    None => warn!(job_id = %job_id, "No checkpoint to resume from, starting over"),
                }
            }
        } else if self.resume {
            return Err(LaunchError::InitializationError(
                "resuming a job requires a state store".to_string(),
            ));
        }

        let execution = runner.run().await;
        let finished_at = Utc::now();

        Ok(SummaryReport {
            job_name: self.job_name.clone(),
            run_id: execution.run_id,
            parameters,
            report: execution.report,
            metrics: metrics.snapshot(),
            resumed_from,
            error: execution.error.map(|e| e.to_string()),
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::memory::{InjectedFailure, MemoryStore};
    use engine_core::state::sled_store::SledStateStore;
    use model::{entities::store::Store, job::status::JobStatus, pagination::cursor::Cursor};

    fn params() -> JobParameters {
        JobParameters::builder()
            .add_string("address", "Seoul")
            .to_job_parameters()
    }

    fn store(n: i64) -> MemoryStore {
        MemoryStore::with_stores(
            (1..=n)
                .map(|id| Store::new(id, &format!("s{id}"), "Seoul"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn resume_without_state_is_rejected() {
        let launcher = JobLauncher::new("job", Adapter::Memory(store(1))).resume(true);
        let result = launcher.launch(params(), &JobSettings::default()).await;
        assert!(matches!(result, Err(LaunchError::InitializationError(_))));
    }

    #[tokio::test]
    async fn relaunch_with_resume_writes_only_the_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let state: Arc<dyn StateStore> = Arc::new(SledStateStore::open(dir.path()).unwrap());
        let memory = store(6);
        memory.fail_write_call(2, InjectedFailure::Fatal).await;
        let settings = JobSettings::default().with_chunk_size(2);

        let launcher = JobLauncher::new("job", Adapter::Memory(memory.clone()))
            .with_state(state.clone())
            .resume(true);

        let first = launcher.launch(params(), &settings).await.unwrap();
        assert_eq!(first.status(), JobStatus::Failed);
        assert_eq!(first.report.last_committed, Cursor::after(2));
        assert!(first.error.is_some());

        let second = launcher.launch(params(), &settings).await.unwrap();
        assert_eq!(second.status(), JobStatus::Completed);
        assert_eq!(second.resumed_from.as_deref(), Some("id>2"));
        assert_eq!(second.report.records_written, 4);
        assert_eq!(memory.history().await.len(), 6);

        let cp = state.load_checkpoint(&second.report.job_id).await.unwrap().unwrap();
        assert_eq!(cp.rows_done, 6);
        assert_eq!(cp.cursor, Cursor::after(6));
    }
}
