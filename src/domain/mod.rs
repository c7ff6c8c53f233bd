//! Core domain types and logic.

pub mod backtest;
pub mod config_validation;
pub mod dates;
pub mod error;
pub mod loader;
pub mod portfolio;
pub mod prices;
pub mod rebalance;
pub mod risk;
pub mod stats;
