pub mod broadcaster;
pub mod builder;
pub mod liability;
pub mod simulator;
pub mod types;
pub mod units;
