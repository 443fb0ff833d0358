use crate::transform::{Transformer, error::TransformError};
use model::entities::{history::StoreHistory, store::Store};

pub const NAME_SEPARATOR: &str = ", ";

/// Flattens a store and its children into a [`StoreHistory`] row.
///
/// Child names keep the order the source returned them in. A store without
/// products or employees yields an empty string for that column.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreHistoryTransformer;

impl StoreHistoryTransformer {
    pub fn snapshot(store: &Store) -> StoreHistory {
        let product_names = join_names(store.products.iter().map(|p| p.name.as_str()));
        let employee_names = join_names(store.employees.iter().map(|e| e.name.as_str()));
        StoreHistory::new(&store.name, &product_names, &employee_names)
    }
}

impl Transformer for StoreHistoryTransformer {
    fn transform(&self, store: &Store) -> Result<Option<StoreHistory>, TransformError> {
        Ok(Some(Self::snapshot(store)))
    }

    fn name(&self) -> &str {
        "store-history"
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(NAME_SEPARATOR)
}
