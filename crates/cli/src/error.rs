use connectors::sql::base::error::{ConnectorError, DbError};
use engine_config::error::ConfigError;
use engine_core::{error::ProgressError, error::StateStoreError};
use engine_runtime::error::LaunchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to load the job configuration: {0}")]
    JobConfig(#[from] ConfigError),

    #[error("Failed to launch the job: {0}")]
    Launch(#[from] LaunchError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid connection format provided: {0}")]
    InvalidConnectionFormat(String),

    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Failed to open state store: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("Failed to load progress: {0}")]
    Progress(#[from] ProgressError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
