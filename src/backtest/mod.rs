pub mod client;
pub mod data_provider;
pub mod request;

pub use client::{BacktestService, HttpBacktestClient};
pub use data_provider::{CsvOutcomeLoader, OutcomeSource};
pub use request::BacktestParameters;
