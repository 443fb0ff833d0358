use crate::sql::{
    base::{destination::HistoryWriter, error::DbError},
    postgres::{
        adapter::PgAdapter,
        query::{insert_history, max_rows_per_insert},
    },
};
use async_trait::async_trait;
use model::entities::history::StoreHistory;
use tokio_postgres::types::ToSql;
use tracing::debug;

/// Inserts history rows into `store_history` inside one transaction.
pub struct PgHistoryWriter {
    adapter: PgAdapter,
}

impl PgHistoryWriter {
    pub fn new(adapter: PgAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl HistoryWriter for PgHistoryWriter {
    async fn insert_all(&self, rows: &[StoreHistory]) -> Result<Vec<i64>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut client = self.adapter.lock_client().await;
        // Dropping the transaction on any early return rolls it back.
        let tx = client.transaction().await?;
        let mut ids = Vec::with_capacity(rows.len());

        for part in rows.chunks(max_rows_per_insert()) {
            let sql = insert_history(part.len());
            let params: Vec<&(dyn ToSql + Sync)> = part
                .iter()
                .flat_map(|r| {
                    [
                        &r.store_name as &(dyn ToSql + Sync),
                        &r.product_names as &(dyn ToSql + Sync),
                        &r.employee_names as &(dyn ToSql + Sync),
                    ]
                })
                .collect();

            debug!(rows = part.len(), "Inserting store_history rows");
            for row in tx.query(&sql, &params).await? {
                ids.push(row.try_get::<_, i64>(0)?);
            }
        }

        if ids.len() != rows.len() {
            return Err(DbError::Write(format!(
                "expected {} generated ids, got {}",
                rows.len(),
                ids.len()
            )));
        }

        tx.commit().await?;
        Ok(ids)
    }

    fn name(&self) -> &str {
        "postgres:store_history"
    }
}
