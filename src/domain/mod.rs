//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod portfolio;
pub mod execution;
pub mod risk;
pub mod engine;
pub mod backtest;
pub mod paper;
pub mod metrics;
pub mod config_validation;
pub mod error;
