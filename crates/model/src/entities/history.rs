use serde::{Deserialize, Serialize};

/// Denormalized snapshot of a store. Holds only derived strings, nothing
/// that refers back to the source aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreHistory {
    /// Assigned by the writer on insert.
    pub id: Option<i64>,
    pub store_name: String,
    pub product_names: String,
    pub employee_names: String,
}

impl StoreHistory {
    pub fn new(store_name: &str, product_names: &str, employee_names: &str) -> Self {
        StoreHistory {
            id: None,
            store_name: store_name.to_string(),
            product_names: product_names.to_string(),
            employee_names: employee_names.to_string(),
        }
    }

    /// Stable byte form used for chunk checksums. The generated id is not
    /// part of it so a row hashes the same before and after insertion.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            self.store_name.len() + self.product_names.len() + self.employee_names.len() + 3,
        );
        for field in [&self.store_name, &self.product_names, &self.employee_names] {
            out.extend_from_slice(field.as_bytes());
            out.push(0x1f);
        }
        out
    }

    pub fn size_bytes(&self) -> usize {
        self.store_name.len() + self.product_names.len() + self.employee_names.len()
    }
}
