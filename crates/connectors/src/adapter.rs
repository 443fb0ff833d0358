use crate::{
    error::AdapterError,
    memory::MemoryStore,
    sql::{
        base::{destination::HistoryWriter, source::PagedSource},
        postgres::{adapter::PgAdapter, destination::PgHistoryWriter, source::PgStoreSource},
    },
};
use std::{path::Path, sync::Arc};

/// A connected store, able to hand out both collaborator contracts.
#[derive(Clone)]
pub enum Adapter {
    Postgres(PgAdapter),
    Memory(MemoryStore),
}

impl Adapter {
    pub async fn postgres(conn_str: &str) -> Result<Self, AdapterError> {
        let adapter = PgAdapter::connect(conn_str).await?;
        Ok(Adapter::Postgres(adapter))
    }

    pub fn memory_fixture(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        Ok(Adapter::Memory(MemoryStore::from_fixture(path)?))
    }

    pub fn source(&self) -> Arc<dyn PagedSource> {
        match self {
            Adapter::Postgres(pg) => Arc::new(PgStoreSource::new(pg.clone())),
            Adapter::Memory(mem) => Arc::new(mem.clone()),
        }
    }

    pub fn writer(&self) -> Arc<dyn HistoryWriter> {
        match self {
            Adapter::Postgres(pg) => Arc::new(PgHistoryWriter::new(pg.clone())),
            Adapter::Memory(mem) => Arc::new(mem.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Adapter::Postgres(_) => "postgres",
            Adapter::Memory(_) => "memory",
        }
    }
}
