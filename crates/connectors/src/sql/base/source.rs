use crate::sql::base::error::DbError;
use async_trait::async_trait;
use model::pagination::page::{FetchResult, PageRequest};

/// Read side of the relational store.
///
/// Implementations must return every store of the page with its `products`
/// and `employees` attached, using a single query per page, ordered by
/// ascending id and starting strictly after `request.cursor`.
#[async_trait]
pub trait PagedSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError>;

    fn name(&self) -> &str;
}
