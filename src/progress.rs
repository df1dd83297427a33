//! Load progress estimation.
//!
//! A loading episode is tracked either from real byte counts (when the
//! source size is known) or from a timer-driven simulation. Both sit behind
//! `ProgressEstimator`; the true completion event always wins.

mod estimator;

pub use estimator::{EstimatorHandle, Progress, ProgressEstimator};
