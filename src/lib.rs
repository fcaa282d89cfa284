//! Parallel forest training and block-aware random sampling for generalized
//! random forests on serially correlated data.
//!
//! [`ForestTrainer`] splits the requested trees into confidence-interval groups,
//! trains contiguous ranges of groups on separate threads and assembles the
//! [`Forest`] in range order. Each tree draws its rows through its own
//! [`RandomSampler`]; growing the tree itself is delegated to a [`Grower`].

// Modules
pub mod constants;
pub mod data;
pub mod errors;
pub mod forest;
pub mod grower;
pub mod options;
pub mod sampler;
pub mod trainer;
pub mod utils;

// Individual classes, and functions
pub use data::{Data, Matrix};
pub use errors::ForestError;
pub use forest::Forest;
pub use grower::{Grower, RecordingGrower, TreeSamples};
pub use options::{ForestOptions, HonestyMethod, OptionsIO, SamplingOptions, TreeOptions};
pub use sampler::RandomSampler;
pub use trainer::ForestTrainer;
