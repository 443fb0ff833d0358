pub mod parameters;
pub mod predicate;
pub mod report;
pub mod status;
