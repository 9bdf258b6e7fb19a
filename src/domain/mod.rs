//! Core domain types and the analytics engine.

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod config_validation;
pub mod error;
pub mod grading;
pub mod indicator;
pub mod metrics;
pub mod optimizer;
pub mod portfolio;
pub mod price;
pub mod regime;
pub mod returns;
pub mod risk;
pub mod signal;
pub mod stats;
