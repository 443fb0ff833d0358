use crate::{entities::history::StoreHistory, pagination::cursor::Cursor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Bookkeeping for one chunk: the source positions that bound it and a
/// summary of the rows it carries. The rows themselves live in the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub seq: u64,
    pub cursor: Cursor, // last committed position when this chunk started
    pub next: Cursor,   // resume-from cursor once this chunk is committed
    /// Source records read before this chunk.
    pub start_offset: u64,
    /// Source records that went into this chunk, emitted or not.
    pub records_read: usize,
    pub manifest: Manifest,
    pub size_bytes: usize,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub row_count: usize,
    pub checksum_xxh3: u64, // rolling checksum over canonicalized rows
}

pub fn manifest_for(rows: &[StoreHistory]) -> Manifest {
    let mut h: u64 = 0;
    for r in rows.iter() {
        h = xxh3_64_with_seed(&r.canonical_bytes(), h);
    }
    Manifest {
        row_count: rows.len(),
        checksum_xxh3: h,
    }
}

impl Chunk {
    /// Summarizes the rows about to be flushed for this chunk.
    pub fn seal(
        seq: u64,
        cursor: Cursor,
        next: Cursor,
        start_offset: u64,
        records_read: usize,
        rows: &[StoreHistory],
    ) -> Self {
        Chunk {
            seq,
            cursor,
            next,
            start_offset,
            records_read,
            manifest: manifest_for(rows),
            size_bytes: rows.iter().map(|r| r.size_bytes()).sum(),
            ts: Utc::now(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.manifest.row_count
    }

    /// Records read but not emitted by the transformer.
    pub fn skipped(&self) -> usize {
        self.records_read.saturating_sub(self.manifest.row_count)
    }
}
