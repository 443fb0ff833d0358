use crate::{
    conn::{ConnectionKind, ConnectionPinger, PostgresConnectionPinger},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use connectors::sql::postgres::adapter::PgAdapter;
use engine_config::config::{JobConfig, SourceConfig};
use engine_core::progress::ProgressService;
use engine_runtime::execution::{executor, factory};
use model::job::parameters::{ADDRESS, JobParameters, REQUEST_DATE};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "store-backup", version = "0.1.0", about = "Store history backup job")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Logs go to stderr; stdout carries the JSON report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            address,
            request_date,
            chunk_size,
            resume,
            env_file,
            state_dir,
            output,
        } => {
            let env = load_env(env_file.as_deref())?;
            let mut job = JobConfig::load(&config)?;
            if let SourceConfig::Postgres { url } = &mut job.source {
                *url = env.substitute(url)?;
            }
            if let Some(size) = chunk_size {
                job.settings.chunk_size = size;
            }

            let params = JobParameters::builder()
                .add_string(ADDRESS, &address)
                .add_optional(REQUEST_DATE, request_date.as_deref())
                .to_job_parameters();

            let state = factory::open_state(&state_dir_or_default(state_dir)?)?;
            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            let summary =
                executor::launch(&job, params, Some(state), resume, shutdown.cancel_token())
                    .await?;

            match output {
                Some(path) => output::write_report(&summary, &path).await?,
                None => output::print_report(&summary)?,
            }

            let code = ExitCode::for_status(summary.status());
            if code != ExitCode::Success {
                std::process::exit(code.as_i32());
            }
        }
        Commands::Progress {
            job,
            state_dir,
            json,
        } => {
            let store = factory::open_state(&state_dir_or_default(state_dir)?)?;
            let status = ProgressService::new(store).job_status(&job).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                output::print_progress_table(&status);
            }
        }
        Commands::InitSchema { conn_str } => {
            let adapter = PgAdapter::connect(&conn_str).await?;
            adapter.init_schema().await?;
            info!("Schema created");
        }
        Commands::TestConn { format, conn_str } => {
            let kind = ConnectionKind::from_str(&format)
                .map_err(|_| CliError::InvalidConnectionFormat(format))?;
            match kind {
                ConnectionKind::Postgres => {
                    PostgresConnectionPinger { conn_str }.ping().await?;
                }
            }
        }
    }

    Ok(())
}

/// Process environment plus `env_file`, or `./.env` when it exists.
fn load_env(env_file: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(".env").is_file() => env.load_from_file(".env")?,
        None => {}
    }
    Ok(env)
}

fn state_dir_or_default(state_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match state_dir {
        Some(dir) => Ok(dir),
        None => Ok(factory::default_state_dir()?),
    }
}
