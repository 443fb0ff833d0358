use engine_core::{connectors::source::PageCursor, error::SourceError};
use model::entities::store::Store;
use std::collections::VecDeque;

/// Regroups source pages into chunks of exactly `chunk_size` stores (the
/// last one may be shorter), whatever page sizes the source returns.
pub(crate) struct ChunkReader {
    cursor: PageCursor,
    pending: VecDeque<Store>,
    chunk_size: usize,
}

impl ChunkReader {
    pub(crate) fn new(cursor: PageCursor, chunk_size: usize) -> Self {
        ChunkReader {
            cursor,
            pending: VecDeque::with_capacity(chunk_size),
            chunk_size,
        }
    }

    /// True once every store the source will ever return has been handed out.
    pub(crate) fn is_drained(&self) -> bool {
        self.cursor.is_exhausted() && self.pending.is_empty()
    }

    pub(crate) fn pages_fetched(&self) -> u64 {
        self.cursor.pages_fetched()
    }

    /// Next chunk's worth of stores; empty when the source is exhausted.
    pub(crate) async fn next_chunk(&mut self) -> Result<Vec<Store>, SourceError> {
        while self.pending.len() < self.chunk_size {
            match self.cursor.next_page().await? {
                Some(page) => self.pending.extend(page),
                None => break,
            }
        }

        let take = self.pending.len().min(self.chunk_size);
        Ok(self.pending.drain(..take).collect())
    }
}
