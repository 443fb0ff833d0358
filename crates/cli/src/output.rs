use crate::error::CliError;
use engine_config::report::summary::SummaryReport;
use engine_core::progress::ProgressStatus;
use std::path::Path;

pub async fn write_report(report: &SummaryReport, path: &Path) -> Result<(), CliError> {
    let report_json = report.to_json_pretty()?;
    tokio::fs::write(path, report_json).await?;
    Ok(())
}

pub fn print_report(report: &SummaryReport) -> Result<(), CliError> {
    println!("{}", report.to_json_pretty()?);
    Ok(())
}

pub fn print_progress_table(status: &ProgressStatus) {
    println!("Progress for job '{}':", status.job_id);
    println!("-----------------------------");
    println!("{:<16} {}", "Stage", status.stage);
    println!(
        "{:<16} {}",
        "Run",
        status.run_id.as_deref().unwrap_or("n/a")
    );
    println!("{:<16} {}", "Chunks", status.chunks_committed);
    println!("{:<16} {}", "Rows done", status.rows_done);
    println!("{:<16} {}", "Last cursor", status.last_cursor);
    let heartbeat = status
        .last_heartbeat
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string());
    println!("{:<16} {}", "Last heartbeat", heartbeat);
    if let Some(err) = &status.last_error {
        println!("{:<16} {}", "Last error", err);
    }
}
