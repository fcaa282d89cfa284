//! Errors
//!
//! Custom error types used throughout the `tsgrf` crate.
use thiserror::Error;

/// Errors that can occur while configuring or training a forest.
#[derive(Debug, Error)]
pub enum ForestError {
    /// The sample fraction selects no observations for a tree.
    #[error("The sample fraction {fraction} is too small for {num_rows} rows, as no observations will be sampled.")]
    InsufficientSampleFraction { fraction: f64, num_rows: usize },
    /// One side of the honesty split would be empty.
    #[error(
        "The honesty fraction {honesty_fraction} is too close to 1 or 0 for {num_rows} rows at sample fraction {sample_fraction}, as no observations will be sampled."
    )]
    InfeasibleHonestyFraction {
        honesty_fraction: f64,
        sample_fraction: f64,
        num_rows: usize,
    },
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Honesty method tag outside of the supported range.
    #[error("Invalid honesty method {0}, expected one of 0, 1, 2, 3, 4.")]
    InvalidHonestyMethod(usize),
    /// More values were requested from `draw` than the domain holds.
    #[error("Cannot draw {requested} distinct values, only {available} are available.")]
    InsufficientDrawDomain { requested: usize, available: usize },
    /// Error raised by a tree grower.
    #[error("Unable to grow tree: {0}")]
    TreeGrowth(String),
    /// The worker pool could not be created.
    #[error("Unable to build thread pool: {0}")]
    ThreadPool(String),
    /// Unable to write options.
    #[error("Unable to write options: {0}")]
    UnableToWrite(String),
    /// Unable to read options.
    #[error("Unable to read options: {0}")]
    UnableToRead(String),
    /// Forests with different metadata cannot be merged.
    #[error("Unable to merge forests: {0}")]
    IncompatibleForests(String),
}
