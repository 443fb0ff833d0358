use crate::sql::{
    base::{error::DbError, source::PagedSource},
    postgres::{adapter::PgAdapter, query::FETCH_STORE_PAGE_SQL},
};
use async_trait::async_trait;
use model::{
    entities::store::{Employee, Product, Store},
    pagination::page::{FetchResult, PageRequest},
};
use tokio_postgres::{Row, types::Json};
use tracing::debug;

/// Pages over `store`, fetching products and employees in the same
/// statement through correlated `json_agg` subqueries.
pub struct PgStoreSource {
    adapter: PgAdapter,
}

impl PgStoreSource {
    pub fn new(adapter: PgAdapter) -> Self {
        Self { adapter }
    }

    fn decode(row: &Row) -> Result<Store, DbError> {
        let Json(products): Json<Vec<Product>> = row
            .try_get("products")
            .map_err(|e| DbError::Decode(format!("products: {e}")))?;
        let Json(employees): Json<Vec<Employee>> = row
            .try_get("employees")
            .map_err(|e| DbError::Decode(format!("employees: {e}")))?;

        Ok(Store {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            products,
            employees,
        })
    }
}

#[async_trait]
impl PagedSource for PgStoreSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError> {
        let pattern = request.predicate.like_pattern();
        let after = request.cursor.last_id();
        let limit = i64::try_from(request.limit)
            .map_err(|_| DbError::QueryBuildError(format!("page size {}", request.limit)))?;

        debug!(cursor = %request.cursor, limit, "Fetching store page");

        let client = self.adapter.read_client().await;
        let rows = client
            .query(FETCH_STORE_PAGE_SQL, &[&pattern, &after, &limit])
            .await?;

        let stores = rows
            .iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FetchResult::from_page(stores, request.limit))
    }

    fn name(&self) -> &str {
        "postgres:store"
    }
}
