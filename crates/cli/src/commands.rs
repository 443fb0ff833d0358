use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the store backup job once
    Run {
        #[arg(long, help = "Job config file path (JSON)")]
        config: PathBuf,

        #[arg(long, help = "Address prefix of the stores to back up")]
        address: String,

        #[arg(long, help = "Request date recorded with the job (RFC 3339); defaults to now")]
        request_date: Option<String>,

        #[arg(long, help = "Overrides settings.chunk_size from the config file")]
        chunk_size: Option<i64>,

        #[arg(long, help = "Continue after the job's last committed chunk")]
        resume: bool,

        #[arg(long, help = "Optional .env file loaded before resolving ${VAR} references")]
        env_file: Option<PathBuf>,

        #[arg(long, help = "State directory (default ~/.store-backup/state)")]
        state_dir: Option<PathBuf>,

        #[arg(
            long,
            help = "If specified, writes the JSON report to this file instead of stdout"
        )]
        output: Option<PathBuf>,
    },
    /// Show the progress of a job from the state store
    Progress {
        #[arg(long, help = "Job id (fingerprint) to inspect")]
        job: String,

        #[arg(long, help = "State directory (default ~/.store-backup/state)")]
        state_dir: Option<PathBuf>,

        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,
    },
    /// Create the store and store_history tables
    InitSchema {
        /// PostgreSQL connection string
        #[arg(long)]
        conn_str: String,
    },
    /// Test a connection string against a given format
    TestConn {
        /// Data format: "pg"
        #[arg(long)]
        format: String,

        /// Connection string or address
        #[arg(long)]
        conn_str: String,
    },
}
