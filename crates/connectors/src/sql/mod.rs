pub mod base;
pub mod postgres;
