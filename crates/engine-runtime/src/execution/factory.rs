use crate::error::LaunchError;
use connectors::adapter::Adapter;
use engine_config::config::SourceConfig;
use engine_core::state::{StateStore, sled_store::SledStateStore};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::info;

const STATE_DIR: &str = ".store-backup/state";

pub async fn create_adapter(source: &SourceConfig) -> Result<Adapter, LaunchError> {
    let adapter = match source {
        SourceConfig::Postgres { url } => Adapter::postgres(url).await?,
        SourceConfig::Memory { fixture } => Adapter::memory_fixture(fixture)?,
    };
    info!(kind = adapter.kind(), "Connected to store");
    Ok(adapter)
}

/// `~/.store-backup/state`, shared by every job of this user.
pub fn default_state_dir() -> Result<PathBuf, LaunchError> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        LaunchError::InitializationError("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(STATE_DIR))
}

pub fn open_state(dir: &Path) -> Result<Arc<dyn StateStore>, LaunchError> {
    let store = SledStateStore::open(dir)?;
    Ok(Arc::new(store))
}
