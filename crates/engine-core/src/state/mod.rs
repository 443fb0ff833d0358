use crate::{
    error::StateStoreError,
    state::models::{Checkpoint, WalEntry},
};
use async_trait::async_trait;

pub mod models;
pub mod sled_store;

/// Durable record of job progress: one checkpoint per job plus an
/// append-only log of lifecycle events.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), StateStoreError>;
    async fn load_checkpoint(&self, job_id: &str) -> Result<Option<Checkpoint>, StateStoreError>;
    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError>;
    async fn iter_wal(&self, job_id: &str) -> Result<Vec<WalEntry>, StateStoreError>;
    /// Drops every WAL entry of `job_id` that belongs to a run other than
    /// `keep_run_id`. Returns the number of entries removed.
    async fn prune_wal(&self, job_id: &str, keep_run_id: &str) -> Result<usize, StateStoreError>;
}
