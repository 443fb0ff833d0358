pub mod entities;
pub mod job;
pub mod pagination;
pub mod records;
