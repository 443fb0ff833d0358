use crate::{entities::store::Store, job::predicate::StorePredicate, pagination::cursor::Cursor};

/// A single page request handed to a paged source.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub predicate: StorePredicate,
    pub cursor: Cursor,
    pub limit: usize,
}

/// Result of one page query.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    pub stores: Vec<Store>,
    /// Resume-from cursor (the last id of this page).
    pub next_cursor: Option<Cursor>,
    /// Set when the page came back shorter than requested.
    pub reached_end: bool,
}

impl FetchResult {
    /// Builds a result from a page of stores sorted by id.
    pub fn from_page(stores: Vec<Store>, limit: usize) -> Self {
        let next_cursor = stores.last().map(|s| Cursor::after(s.id));
        let reached_end = stores.len() < limit;
        FetchResult {
            stores,
            next_cursor,
            reached_end,
        }
    }

    pub fn row_count(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
