use crate::sql::{
    base::error::{ConnectorError, DbError},
    postgres::{query::SCHEMA_SQL, utils::connect_client},
};
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_postgres::Client;
use tracing::info;

/// Shared handle to one Postgres connection.
///
/// Reads take the lock shared; anything that opens a transaction needs the
/// client mutably and takes it exclusively.
#[derive(Clone)]
pub struct PgAdapter {
    client: Arc<RwLock<Client>>,
}

impl PgAdapter {
    pub async fn connect(url: &str) -> Result<Self, ConnectorError> {
        let client = Arc::new(RwLock::new(connect_client(url).await?));
        Ok(PgAdapter { client })
    }

    pub async fn read_client(&self) -> RwLockReadGuard<'_, Client> {
        self.client.read().await
    }

    pub async fn lock_client(&self) -> RwLockWriteGuard<'_, Client> {
        self.client.write().await
    }

    pub async fn exec(&self, query: &str) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.batch_execute(query).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        let client = self.client.read().await;
        client.simple_query("SELECT 1").await?;
        Ok(())
    }

    /// Creates the store, child and history tables if they are missing.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        self.exec(SCHEMA_SQL).await?;
        info!("Store backup schema is in place");
        Ok(())
    }
}
