pub mod lcd;
pub mod query;
pub mod types;
