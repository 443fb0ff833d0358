use crate::error::SourceError;
use connectors::sql::base::{error::DbError, source::PagedSource};
use model::{
    entities::store::Store,
    job::predicate::StorePredicate,
    pagination::{cursor::Cursor, page::PageRequest},
};
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::debug;

/// A forward-only walk over the pages matching one predicate.
///
/// Every call to [`PageCursor::next_page`] costs at most one read query.
/// The only way to go back is to open a new cursor.
pub struct PageCursor {
    source: Arc<dyn PagedSource>,
    predicate: StorePredicate,
    page_size: usize,
    position: Cursor,
    exhausted: bool,
    fetch_timeout: Option<Duration>,
    pages_fetched: u64,
}

impl PageCursor {
    /// Validates the predicate and prepares the cursor. No I/O happens here.
    pub fn open(
        source: Arc<dyn PagedSource>,
        predicate: StorePredicate,
        page_size: usize,
        start: Cursor,
    ) -> Result<Self, SourceError> {
        predicate
            .validate()
            .map_err(|e| SourceError::Query(e.to_string()))?;
        if page_size == 0 {
            return Err(SourceError::Query("page size must be positive".into()));
        }

        Ok(PageCursor {
            source,
            predicate,
            page_size,
            position: start,
            exhausted: false,
            fetch_timeout: None,
            pages_fetched: 0,
        })
    }

    pub fn with_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = Some(fetch_timeout);
        self
    }

    /// Position after the last record handed out.
    pub fn position(&self) -> Cursor {
        self.position
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetches the next page, or `None` once the source has no more matching
    /// records.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Store>>, SourceError> {
        if self.exhausted {
            return Ok(None);
        }

        let request = PageRequest {
            predicate: self.predicate.clone(),
            cursor: self.position,
            limit: self.page_size,
        };

        let fetch = self.source.fetch_page(&request);
        let result = match self.fetch_timeout {
            Some(limit) => timeout(limit, fetch).await.map_err(|_| {
                SourceError::Unavailable(format!(
                    "{} did not answer within {} ms",
                    self.source.name(),
                    limit.as_millis()
                ))
            })?,
            None => fetch.await,
        }
        .map_err(classify_db_error)?;
        self.pages_fetched += 1;

        if result.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        self.check_order(&result.stores)?;

        if let Some(next) = result.next_cursor {
            self.position = next;
        }
        // A short page is the last one; skip the empty round trip.
        self.exhausted = result.reached_end;

        debug!(
            page = self.pages_fetched,
            rows = result.row_count(),
            cursor = %self.position,
            "Fetched page"
        );
        Ok(Some(result.stores))
    }

    fn check_order(&self, stores: &[Store]) -> Result<(), SourceError> {
        let mut last = self.position.last_id();
        for store in stores {
            if last.is_some_and(|prev| store.id <= prev) {
                return Err(SourceError::Query(format!(
                    "{} returned store {} out of ascending id order",
                    self.source.name(),
                    store.id
                )));
            }
            last = Some(store.id);
        }
        Ok(())
    }
}

/// Splits store errors into rejected queries and everything else.
pub fn classify_db_error(err: DbError) -> SourceError {
    match &err {
        DbError::QueryBuildError(_) | DbError::Decode(_) => SourceError::Query(err.to_string()),
        DbError::PgError(pg) => match pg.code().map(|c| c.code()) {
            // 42: syntax error or access rule violation, 22: data exception
            Some(code) if code.starts_with("42") || code.starts_with("22") => {
                SourceError::Query(err.to_string())
            }
            _ => SourceError::Unavailable(err.to_string()),
        },
        DbError::Io(_) | DbError::Unavailable(_) | DbError::Write(_) => {
            SourceError::Unavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connectors::memory::MemoryStore;
    use model::pagination::page::FetchResult;

    fn seoul_stores(n: i64) -> MemoryStore {
        MemoryStore::with_stores(
            (1..=n)
                .map(|id| Store::new(id, &format!("s{id}"), "Seoul"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn walks_all_pages_then_stops() {
        let store = seoul_stores(5);
        let mut cursor = PageCursor::open(
            Arc::new(store.clone()),
            StorePredicate::address_prefix("Seoul"),
            2,
            Cursor::None,
        )
        .unwrap();

        let mut sizes = Vec::new();
        while let Some(page) = cursor.next_page().await.unwrap() {
            sizes.push(page.len());
        }

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(cursor.position(), Cursor::after(5));
        // The short last page ends the walk without an extra query.
        assert_eq!(store.read_queries().await, 3);
        assert!(cursor.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_last_page_costs_one_empty_fetch() {
        let store = seoul_stores(4);
        let mut cursor =
            PageCursor::open(Arc::new(store.clone()), StorePredicate::All, 2, Cursor::None)
                .unwrap();

        while cursor.next_page().await.unwrap().is_some() {}
        assert_eq!(store.read_queries().await, 3);
    }

    #[test]
    fn rejects_malformed_predicate_before_io() {
        let store = seoul_stores(1);
        let result = PageCursor::open(
            Arc::new(store),
            StorePredicate::address_prefix(" "),
            10,
            Cursor::None,
        );
        assert!(matches!(result, Err(SourceError::Query(_))));
    }

    struct Shuffled;

    #[async_trait]
    impl PagedSource for Shuffled {
        async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError> {
            let stores = vec![Store::new(3, "s3", "x"), Store::new(2, "s2", "x")];
            Ok(FetchResult::from_page(stores, request.limit))
        }

        fn name(&self) -> &str {
            "shuffled"
        }
    }

    #[tokio::test]
    async fn out_of_order_pages_are_rejected() {
        let mut cursor =
            PageCursor::open(Arc::new(Shuffled), StorePredicate::All, 10, Cursor::None).unwrap();
        assert!(matches!(
            cursor.next_page().await,
            Err(SourceError::Query(_))
        ));
    }

    struct Stalled;

    #[async_trait]
    impl PagedSource for Stalled {
        async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(FetchResult::from_page(Vec::new(), request.limit))
        }

        fn name(&self) -> &str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn slow_page_times_out_as_unavailable() {
        let mut cursor = PageCursor::open(Arc::new(Stalled), StorePredicate::All, 10, Cursor::None)
            .unwrap()
            .with_timeout(Duration::from_millis(50));

        assert!(matches!(
            cursor.next_page().await,
            Err(SourceError::Unavailable(msg)) if msg.contains("stalled")
        ));
        assert_eq!(cursor.pages_fetched(), 0);
        assert_eq!(cursor.position(), Cursor::None);
    }

    #[tokio::test]
    async fn offline_store_is_unavailable() {
        let store = seoul_stores(1);
        store.set_reads_unavailable(true).await;
        let mut cursor =
            PageCursor::open(Arc::new(store), StorePredicate::All, 10, Cursor::None).unwrap();
        assert!(matches!(
            cursor.next_page().await,
            Err(SourceError::Unavailable(_))
        ));
    }
}
