pub mod aggregation;
pub mod statistics;
