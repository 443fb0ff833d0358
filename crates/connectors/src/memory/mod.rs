pub mod store;

pub use store::{InjectedFailure, MemoryStore};
