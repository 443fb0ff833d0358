use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::entities::history::StoreHistory;

/// Write side of the relational store.
#[async_trait]
pub trait HistoryWriter: Send + Sync {
    /// Inserts all rows in one transaction and returns the generated ids in
    /// input order. Either every row is visible afterwards or none is.
    async fn insert_all(&self, rows: &[StoreHistory]) -> Result<Vec<i64>, DbError>;

    fn name(&self) -> &str;
}
