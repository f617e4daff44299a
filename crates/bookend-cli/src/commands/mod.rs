pub mod config;
pub mod day;
pub mod habit;
pub mod sequence;
