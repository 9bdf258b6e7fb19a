//! Port traits the analyzer depends on.

pub mod config_port;
pub mod market_data_port;
pub mod portfolio_store_port;
