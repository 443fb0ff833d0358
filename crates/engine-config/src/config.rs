use crate::{
    error::ConfigError,
    settings::{JobSettings, validated::ValidatedSettings, validator::SettingsValidator},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_JOB_NAME: &str = "storeBackupBatch";

/// Where the job reads stores from and writes history rows to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// A PostgreSQL database holding both the store tables and `store_history`.
    Postgres { url: String },
    /// An in-process store seeded from a JSON fixture of stores.
    Memory { fixture: PathBuf },
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceConfig::Postgres { .. } => "postgres",
            SourceConfig::Memory { .. } => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default = "default_job_name")]
    pub job_name: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub settings: JobSettings,
}

fn default_job_name() -> String {
    DEFAULT_JOB_NAME.to_string()
}

impl JobConfig {
    pub fn new(source: SourceConfig) -> Self {
        JobConfig {
            job_name: default_job_name(),
            source,
            settings: JobSettings::default(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&raw)?;

        // Fixture paths are relative to the config file, not the cwd.
        if let SourceConfig::Memory { fixture } = &mut config.source
            && fixture.is_relative()
            && let Some(dir) = path.parent()
        {
            *fixture = dir.join(&*fixture);
        }

        debug!(path = %path.display(), source = config.source.kind(), "Loaded job config");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: JobConfig = serde_json::from_str(raw)?;
        config.check()?;
        Ok(config)
    }

    /// Validates the settings section. Chunk size errors surface here.
    pub fn validated_settings(&self) -> Result<ValidatedSettings, ConfigError> {
        Ok(SettingsValidator::validate(&self.settings)?)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.job_name.trim().is_empty() {
            return Err(ConfigError::BlankJobName);
        }
        match &self.source {
            SourceConfig::Postgres { url } if url.trim().is_empty() => {
                Err(ConfigError::MissingSourceField {
                    kind: "postgres",
                    field: "url",
                })
            }
            SourceConfig::Memory { fixture } if fixture.as_os_str().is_empty() => {
                Err(ConfigError::MissingSourceField {
                    kind: "memory",
                    field: "fixture",
                })
            }
            _ => Ok(()),
        }
    }
}
