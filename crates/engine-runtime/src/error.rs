use connectors::error::AdapterError;
use engine_config::error::ConfigError;
use engine_core::error::StateStoreError;
use thiserror::Error;

/// Failures that prevent a job execution from being set up. Failures of the
/// job itself are reported through its status instead.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),
}
