use crate::settings::error::SettingsError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a job configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Job name must not be blank")]
    BlankJobName,

    #[error("Source `{kind}` requires `{field}`")]
    MissingSourceField { kind: &'static str, field: &'static str },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
