pub mod error;
pub mod retry;
pub mod runner;
pub mod transform;
