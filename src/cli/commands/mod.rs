//! CLI command implementations.

pub mod backtest;
mod common;
pub mod monte_carlo;
pub mod strategies;
pub mod validate;
pub mod walk_forward;
