pub mod cleaning;
pub mod config;
pub mod error;
pub mod forecast;
pub mod index;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod reports;
pub mod stats;
