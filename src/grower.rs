//! Grower
//!
//! The call contract between the forest trainer and whatever grows an individual
//! tree. Split search, leaf estimates and relabeling live behind this trait.
use crate::data::Data;
use crate::errors::ForestError;
use crate::options::TreeOptions;
use crate::sampler::RandomSampler;

/// Trait for growing one tree from an in-bag sample.
pub trait Grower: Sync {
    /// Tree produced by the grower. Trees are moved between threads on their
    /// way into the forest.
    type Tree: Send;

    /// Grow a tree.
    ///
    /// * `data` - Training data, shared read-only between threads.
    /// * `sampler` - The tree's sampler. Honesty splits, cluster expansion and
    ///   feature draws must go through it to keep training reproducible.
    /// * `samples` - In-bag rows, or cluster ids when clusters are configured.
    /// * `options` - Tree options.
    /// * `blocks` - Block decomposition of `samples`, empty when rows were not
    ///   drawn in blocks.
    fn grow<D: Data>(
        &self,
        data: &D,
        sampler: &mut RandomSampler,
        samples: &[usize],
        options: &TreeOptions,
        blocks: &[Vec<usize>],
    ) -> Result<Self::Tree, ForestError>;
}

/// Rows a tree was trained on.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TreeSamples {
    /// In-bag rows after cluster expansion.
    pub drawn: Vec<usize>,
    /// Rows used to pick splits.
    pub structure: Vec<usize>,
    /// Rows used for leaf estimates. Equal to `structure` without honesty.
    pub estimation: Vec<usize>,
    /// Block decomposition handed to the grower.
    pub blocks: Vec<Vec<usize>>,
}

/// Grower that performs the honesty split and records the resulting row sets
/// instead of searching for splits.
///
/// Useful to inspect the sampling of a configuration, e.g. coverage of rows
/// across trees or out-of-bag sets, without an estimator attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordingGrower;

impl Grower for RecordingGrower {
    type Tree = TreeSamples;

    fn grow<D: Data>(
        &self,
        data: &D,
        sampler: &mut RandomSampler,
        samples: &[usize],
        options: &TreeOptions,
        blocks: &[Vec<usize>],
    ) -> Result<Self::Tree, ForestError> {
        let drawn = sampler.sample_from_clusters(samples);
        if let Some(row) = drawn.iter().find(|row| **row >= data.num_rows()) {
            return Err(ForestError::TreeGrowth(format!(
                "row {} is out of range for {} rows",
                row,
                data.num_rows()
            )));
        }

        let (structure, estimation) = if options.honesty {
            let (structure_units, estimation_units) = sampler.honesty_split(samples, blocks, options);
            (
                sampler.sample_from_clusters(&structure_units),
                sampler.sample_from_clusters(&estimation_units),
            )
        } else {
            (drawn.clone(), drawn.clone())
        };

        Ok(TreeSamples {
            drawn,
            structure,
            estimation,
            blocks: blocks.to_vec(),
        })
    }
}
