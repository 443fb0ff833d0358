use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Transformation of store {store_id} failed: {message}")]
    Transformation { store_id: i64, message: String },
}
