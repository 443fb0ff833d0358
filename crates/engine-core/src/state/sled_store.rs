use crate::{
    error::StateStoreError,
    state::{
        StateStore,
        models::{Checkpoint, CheckpointStage, WalEntry},
    },
};
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;

pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    #[inline]
    fn chk_key(job_id: &str) -> String {
        format!("chk:{}", job_id)
    }

    /// Within one run the checkpoint only moves forward; a new run replaces
    /// it unconditionally.
    fn should_replace(existing: &Checkpoint, next: &Checkpoint) -> bool {
        if existing.run_id != next.run_id {
            return true;
        }
        if existing.stage == CheckpointStage::Done {
            return false;
        }
        next.chunk_seq >= existing.chunk_seq
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn save_checkpoint(&self, cp: &Checkpoint) -> Result<(), StateStoreError> {
        let key = Self::chk_key(&cp.job_id);
        let new_bytes = bincode::serialize(cp)?;

        // Check-then-set must be atomic against a concurrent writer of the
        // same job.
        let result = self
            .db
            .transaction::<_, _, bincode::Error>(|tx_db| {
                if let Some(existing_bytes) = tx_db.get(&key)? {
                    let existing: Checkpoint = bincode::deserialize(&existing_bytes)
                        .map_err(ConflictableTransactionError::Abort)?;

                    if !Self::should_replace(&existing, cp) {
                        return Ok(());
                    }
                }

                tx_db.insert(key.as_bytes(), new_bytes.as_slice())?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(StateStoreError::Encoding(e)),
            Err(TransactionError::Storage(e)) => Err(StateStoreError::Storage(e)),
        }
    }

    async fn load_checkpoint(&self, job_id: &str) -> Result<Option<Checkpoint>, StateStoreError> {
        match self.db.get(Self::chk_key(job_id))? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn append_wal(&self, entry: &WalEntry) -> Result<(), StateStoreError> {
        // sled ids are monotonic across restarts, so keys sort in append order.
        let seq = self.db.generate_id()?;
        let key = format!("wal:{}:{:020}", entry.job_id(), seq);
        let value = bincode::serialize(entry)?;

        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn iter_wal(&self, job_id: &str) -> Result<Vec<WalEntry>, StateStoreError> {
        let prefix = format!("wal:{}:", job_id);
        let mut entries = Vec::new();

        for item in self.db.scan_prefix(prefix) {
            let (_key, value) = item?;
            entries.push(bincode::deserialize(&value)?);
        }

        Ok(entries)
    }

    async fn prune_wal(&self, job_id: &str, keep_run_id: &str) -> Result<usize, StateStoreError> {
        let prefix = format!("wal:{}:", job_id);
        let mut batch = sled::Batch::default();
        let mut removed = 0;

        for item in self.db.scan_prefix(prefix) {
            let (key, value) = item?;
            let entry: WalEntry = bincode::deserialize(&value)?;
            if entry.run_id() != keep_run_id {
                batch.remove(key);
                removed += 1;
            }
        }

        if removed > 0 {
            self.db.apply_batch(batch)?;
            self.db.flush_async().await?;
        }
        Ok(removed)
    }
}
