use chrono::{DateTime, Utc};
use engine_core::metrics::MetricsSnapshot;
use model::job::{report::JobReport, status::JobStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the CLI prints or writes about one finished job execution.
#[derive(Serialize, Debug, Clone)]
pub struct SummaryReport {
    pub job_name: String,
    pub run_id: String,
    pub parameters: BTreeMap<String, String>,
    #[serde(flatten)]
    pub report: JobReport,
    pub metrics: MetricsSnapshot,
    /// Present when the job was resumed from an earlier checkpoint.
    pub resumed_from: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl SummaryReport {
    pub fn status(&self) -> JobStatus {
        self.report.status
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::pagination::cursor::Cursor;

    #[test]
    fn report_fields_are_flattened() {
        let mut report = JobReport::new("job-1", Cursor::None);
        report.status = JobStatus::Completed;
        report.records_written = 2;

        let now = Utc::now();
        let summary = SummaryReport {
            job_name: "storeBackupBatch".into(),
            run_id: "run-1".into(),
            parameters: BTreeMap::from([("address".to_string(), "Seoul".to_string())]),
            report,
            metrics: MetricsSnapshot::default(),
            resumed_from: None,
            error: None,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        };

        let json: serde_json::Value =
            serde_json::from_str(&summary.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["status"], "COMPLETED");
        assert_eq!(json["records_written"], 2);
        assert_eq!(json["parameters"]["address"], "Seoul");
    }
}
