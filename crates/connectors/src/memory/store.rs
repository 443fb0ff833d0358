use crate::sql::base::{
    destination::HistoryWriter, error::DbError, source::PagedSource,
};
use async_trait::async_trait;
use model::{
    entities::{history::StoreHistory, store::Store},
    pagination::page::{FetchResult, PageRequest},
};
use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::Path,
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::debug;

/// How an injected write failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Looks like a dropped connection; worth retrying.
    Transient,
    /// Looks like a rejected statement.
    Fatal,
}

#[derive(Debug, Default)]
struct Inner {
    stores: BTreeMap<i64, Store>,
    history: Vec<StoreHistory>,
    next_history_id: i64,
    read_queries: u64,
    write_calls: u64,
    write_failures: HashMap<u64, InjectedFailure>,
    reads_unavailable: bool,
}

/// In-process relational store. Children live inside their store, so a page
/// read is one lookup no matter how many children there are.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stores(stores: Vec<Store>) -> Self {
        let inner = Inner {
            stores: stores.into_iter().map(|s| (s.id, s)).collect(),
            next_history_id: 1,
            ..Inner::default()
        };
        MemoryStore {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Loads stores from a JSON array fixture.
    pub fn from_fixture(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let stores: Vec<Store> = serde_json::from_str(&raw)
            .map_err(|e| DbError::Decode(format!("{}: {e}", path.as_ref().display())))?;
        Ok(Self::with_stores(stores))
    }

    /// Makes the `call`-th write (1-based, counted across the store's
    /// lifetime) fail.
    pub async fn fail_write_call(&self, call: u64, failure: InjectedFailure) {
        self.inner.lock().await.write_failures.insert(call, failure);
    }

    pub async fn set_reads_unavailable(&self, unavailable: bool) {
        self.inner.lock().await.reads_unavailable = unavailable;
    }

    pub async fn history(&self) -> Vec<StoreHistory> {
        self.inner.lock().await.history.clone()
    }

    pub async fn read_queries(&self) -> u64 {
        self.inner.lock().await.read_queries
    }

    pub async fn write_calls(&self) -> u64 {
        self.inner.lock().await.write_calls
    }
}

#[async_trait]
impl PagedSource for MemoryStore {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FetchResult, DbError> {
        let mut inner = self.inner.lock().await;
        if inner.reads_unavailable {
            return Err(DbError::Unavailable("memory store is offline".into()));
        }
        inner.read_queries += 1;

        let lower = match request.cursor.last_id() {
            Some(id) => std::ops::Bound::Excluded(id),
            None => std::ops::Bound::Unbounded,
        };
        let stores = inner
            .stores
            .range((lower, std::ops::Bound::Unbounded))
            .map(|(_, store)| store)
            .filter(|store| request.predicate.matches(store))
            .take(request.limit)
            .cloned()
            .collect::<Vec<_>>();

        debug!(cursor = %request.cursor, rows = stores.len(), "Served memory page");
        Ok(FetchResult::from_page(stores, request.limit))
    }

    fn name(&self) -> &str {
        "memory:store"
    }
}

#[async_trait]
impl HistoryWriter for MemoryStore {
    async fn insert_all(&self, rows: &[StoreHistory]) -> Result<Vec<i64>, DbError> {
        let mut inner = self.inner.lock().await;
        inner.write_calls += 1;

        let call = inner.write_calls;
        match inner.write_failures.remove(&call) {
            Some(InjectedFailure::Transient) => {
                return Err(DbError::Io(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    format!("injected transient failure on write {call}"),
                )));
            }
            Some(InjectedFailure::Fatal) => {
                return Err(DbError::Write(format!(
                    "injected failure on write {call}"
                )));
            }
            None => {}
        }

        // Nothing is appended until every row has an id, so a failed call
        // leaves no trace.
        let first = inner.next_history_id.max(1);
        let ids = (first..first + rows.len() as i64).collect::<Vec<_>>();
        inner.next_history_id = first + rows.len() as i64;
        for (row, id) in rows.iter().zip(&ids) {
            let mut row = row.clone();
            row.id = Some(*id);
            inner.history.push(row);
        }
        Ok(ids)
    }

    fn name(&self) -> &str {
        "memory:store_history"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{job::predicate::StorePredicate, pagination::cursor::Cursor};
    use std::io::Write;

    fn request(predicate: StorePredicate, cursor: Cursor, limit: usize) -> PageRequest {
        PageRequest {
            predicate,
            cursor,
            limit,
        }
    }

    fn stores() -> Vec<Store> {
        vec![
            Store::new(1, "s1", "Seoul a1"),
            Store::new(2, "s2", "Newyork a2"),
            Store::new(3, "s3", "Seoul a3"),
            Store::new(4, "s4", "Seoul a4"),
        ]
    }

    #[tokio::test]
    async fn pages_are_ordered_and_keyed_on_id() {
        let store = MemoryStore::with_stores(stores());
        let seoul = StorePredicate::address_prefix("Seoul");

        let first = store
            .fetch_page(&request(seoul.clone(), Cursor::None, 2))
            .await
            .unwrap();
        assert_eq!(
            first.stores.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(first.next_cursor, Some(Cursor::after(3)));
        assert!(!first.reached_end);

        let second = store
            .fetch_page(&request(seoul, Cursor::after(3), 2))
            .await
            .unwrap();
        assert_eq!(
            second.stores.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![4]
        );
        assert!(second.reached_end);
        assert_eq!(store.read_queries().await, 2);
    }

    #[tokio::test]
    async fn injected_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.fail_write_call(1, InjectedFailure::Fatal).await;

        let rows = vec![StoreHistory::new("s1", "p1", "e1")];
        assert!(store.insert_all(&rows).await.is_err());
        assert!(store.history().await.is_empty());

        let ids = store.insert_all(&rows).await.unwrap();
        assert_eq!(ids, vec![1]);
        assert_eq!(store.history().await[0].id, Some(1));
    }

    #[tokio::test]
    async fn loads_fixture_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":1,"name":"s1","address":"Seoul a1",
                "products":[{{"id":1,"name":"p1","price":1000,"store_id":1}}]}}]"#
        )
        .unwrap();

        let store = MemoryStore::from_fixture(file.path()).unwrap();
        let page = store
            .fetch_page(&request(StorePredicate::All, Cursor::None, 10))
            .await
            .unwrap();
        assert_eq!(page.stores[0].products[0].name, "p1");
    }
}
