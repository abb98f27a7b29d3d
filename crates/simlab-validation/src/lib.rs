//! Overfitting validation.
//!
//! - [`WalkForwardOptimizer`]: rolling in-sample grid search with
//!   out-of-sample confirmation
//! - [`MonteCarloSimulator`]: trade-order resampling of a finished run
//!
//! Both fan independent units (windows, parameter combinations, trials) out
//! over a bounded rayon pool and honor a shared [`CancellationFlag`].

mod error;
mod monte_carlo;
mod pool;
mod walk_forward;

pub use error::ValidationError;
pub use monte_carlo::{MetricSummary, MonteCarloConfig, MonteCarloResult, MonteCarloSimulator};
pub use pool::{build_pool, CancellationFlag};
pub use walk_forward::{
    ObjectiveMetric, ParameterGrid, ParameterStability, UnqualifiedWindow, WalkForwardConfig,
    WalkForwardOptimizer, WalkForwardResult, WalkForwardWindow, WindowResult,
};
