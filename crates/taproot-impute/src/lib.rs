//! Proximity-weighted iterative imputation for incomplete numeric
//! matrices.
//!
//! Missing cells start at their column median, then each iteration
//! fits a preliminary random forest on the current fill and replaces
//! every missing cell with the proximity-weighted average of the
//! column's originally observed values. The loop runs a fixed number
//! of iterations by default; an OOB-stabilization rule is available as
//! an opt-in alternative.

mod error;
mod impute;

pub use error::ImputeError;
pub use impute::{ImputeConfig, ImputeOutcome, ImputedMatrix, IterationStat, StopRule};
