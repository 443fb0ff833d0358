use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a paged read over the store table.
///
/// Pages are keyed on the strictly increasing store id, so a cursor only
/// needs the last id handed out to resume without gaps or duplicates.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    /// Nothing read yet; the next page starts at the lowest id.
    #[default]
    None,

    /// Primary key cursor: the next page holds ids strictly greater than `id`.
    Pk { id: i64 },
}

impl Cursor {
    pub fn after(id: i64) -> Self {
        Cursor::Pk { id }
    }

    /// Lower exclusive bound for the next page, if any.
    pub fn last_id(&self) -> Option<i64> {
        match self {
            Cursor::None => None,
            Cursor::Pk { id } => Some(*id),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::None => f.write_str("start"),
            Cursor::Pk { id } => write!(f, "id>{id}"),
        }
    }
}
