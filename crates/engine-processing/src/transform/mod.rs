use crate::transform::error::TransformError;
use model::entities::{history::StoreHistory, store::Store};

pub mod error;
pub mod history;

/// Maps one source store to at most one history row.
///
/// Returning `Ok(None)` skips the store; it is counted as read but not as
/// written. An error aborts the chunk the store belongs to.
pub trait Transformer: Send + Sync {
    fn transform(&self, store: &Store) -> Result<Option<StoreHistory>, TransformError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
