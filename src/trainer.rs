//! Trainer
//!
//! Parallel training of a forest. The requested trees are grouped into
//! confidence-interval groups, the groups are split into contiguous ranges, one
//! per thread, and each range is trained as an independent batch with its own
//! seeded generator. Batches are concatenated in range order, so the result only
//! depends on the seed and the thread count, never on scheduling.
use crate::constants::CI_HALF_SAMPLE_FRACTION;
use crate::data::Data;
use crate::errors::ForestError;
use crate::forest::Forest;
use crate::grower::Grower;
use crate::options::ForestOptions;
use crate::sampler::RandomSampler;
use crate::utils::split_sequence;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Forest trainer, generic over the tree grower.
pub struct ForestTrainer<G> {
    grower: G,
}

impl<G: Grower> ForestTrainer<G> {
    pub fn new(grower: G) -> Self {
        ForestTrainer { grower }
    }

    pub fn grower(&self) -> &G {
        &self.grower
    }

    /// Train a forest.
    ///
    /// * `data` - Training data, read concurrently by every batch.
    /// * `options` - Forest options.
    ///
    /// Fails before any tree is grown if the sample fraction or the honesty
    /// fraction leaves a tree without observations. A grower failure in any
    /// batch aborts the whole call once all batches have finished.
    pub fn train<D: Data>(&self, data: &D, options: &ForestOptions) -> Result<Forest<G::Tree>, ForestError> {
        let trees = self.train_trees(data, options)?;
        let num_variables = data
            .num_cols()
            .saturating_sub(data.disallowed_split_variables().len());
        Ok(Forest::new(trees, num_variables, options.ci_group_size))
    }

    fn train_trees<D: Data>(&self, data: &D, options: &ForestOptions) -> Result<Vec<G::Tree>, ForestError> {
        let num_rows = data.num_rows();
        options.validate()?;
        check_sample_size(num_rows, options)?;

        let num_groups = options.num_groups();
        if num_groups == 0 {
            warn!(
                "num_trees {} is smaller than ci_group_size {}, no trees will be trained.",
                options.num_trees, options.ci_group_size
            );
            return Ok(Vec::new());
        }
        if options.num_trees % options.ci_group_size != 0 {
            warn!(
                "num_trees {} is not a multiple of ci_group_size {}, training {} trees.",
                options.num_trees,
                options.ci_group_size,
                num_groups * options.ci_group_size
            );
        }

        let num_threads = options.resolved_num_threads();
        let thread_ranges = split_sequence(0, num_groups, num_threads);
        info!(
            "Training {} groups of {} trees on {} rows in {} batches, block bootstrap: {}.",
            num_groups,
            options.ci_group_size,
            num_rows,
            thread_ranges.len() - 1,
            options.block_bootstrap
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.min(thread_ranges.len() - 1).max(1))
            .build()
            .map_err(|e| ForestError::ThreadPool(e.to_string()))?;

        // Every batch runs to completion, errors are raised in range order afterwards.
        let batches: Vec<Result<Vec<G::Tree>, ForestError>> = pool.install(|| {
            thread_ranges
                .par_windows(2)
                .map(|range| self.train_batch(range[0], range[1] - range[0], data, options))
                .collect()
        });

        let mut trees = Vec::with_capacity(num_groups * options.ci_group_size);
        for batch in batches {
            trees.extend(batch?);
        }
        Ok(trees)
    }

    /// Train the groups `start..start + num_groups` with a generator seeded from
    /// `seed + start`.
    fn train_batch<D: Data>(
        &self,
        start: usize,
        num_groups: usize,
        data: &D,
        options: &ForestOptions,
    ) -> Result<Vec<G::Tree>, ForestError> {
        debug!("Batch starting at group {} trains {} groups.", start, num_groups);
        let ci_group_size = options.ci_group_size;
        let block_group_size = options.block_group_size();

        let mut rng = StdRng::seed_from_u64(options.seed.wrapping_add(start as u64));
        let mut trees = Vec::with_capacity(num_groups * ci_group_size);
        for _ in 0..num_groups {
            let tree_seed: u32 = rng.gen();
            let mut sampler = RandomSampler::new(u64::from(tree_seed), &options.sampling_options);
            if ci_group_size == 1 {
                trees.push(self.train_tree(data, &mut sampler, options, block_group_size)?);
            } else {
                trees.extend(self.train_ci_group(data, &mut sampler, options, block_group_size)?);
            }
        }
        debug!("Batch starting at group {} finished with {} trees.", start, trees.len());
        Ok(trees)
    }

    /// Grow one tree. Rows are drawn in blocks only in block bootstrap mode,
    /// otherwise the grower receives no blocks and `block_group_size` is unused.
    fn train_tree<D: Data>(
        &self,
        data: &D,
        sampler: &mut RandomSampler,
        options: &ForestOptions,
        block_group_size: usize,
    ) -> Result<G::Tree, ForestError> {
        let num_rows = data.num_rows();
        if options.block_bootstrap {
            let (samples, blocks) = sampler.sample_cluster_blocks(num_rows, options.sample_fraction, block_group_size);
            self.grower
                .grow(data, sampler, &samples, &options.tree_options, &blocks)
        } else {
            let samples = sampler.sample_clusters(num_rows, options.sample_fraction);
            self.grower.grow(data, sampler, &samples, &options.tree_options, &[])
        }
    }

    /// Grow `ci_group_size` trees from one shared half-sample of blocks, each
    /// from its own sub-sample of those blocks.
    fn train_ci_group<D: Data>(
        &self,
        data: &D,
        sampler: &mut RandomSampler,
        options: &ForestOptions,
        block_group_size: usize,
    ) -> Result<Vec<G::Tree>, ForestError> {
        let (_, blocks) = sampler.sample_cluster_blocks(data.num_rows(), CI_HALF_SAMPLE_FRACTION, block_group_size);
        let sample_fraction = options.sample_fraction * 2.0;

        let mut trees = Vec::with_capacity(options.ci_group_size);
        for _ in 0..options.ci_group_size {
            let (samples, sub_blocks) = sampler.subsample_for_ci_group(&blocks, sample_fraction);
            let tree = self
                .grower
                .grow(data, sampler, &samples, &options.tree_options, &sub_blocks)?;
            trees.push(tree);
        }
        Ok(trees)
    }
}

/// Check that every tree, and each half of an honest tree, gets at least one observation.
pub fn check_sample_size(num_rows: usize, options: &ForestOptions) -> Result<(), ForestError> {
    let sample_size = num_rows as f64 * options.sample_fraction;
    if sample_size < 1.0 {
        return Err(ForestError::InsufficientSampleFraction {
            fraction: options.sample_fraction,
            num_rows,
        });
    }
    let tree_options = &options.tree_options;
    let honesty_fraction = tree_options.honesty_fraction;
    if tree_options.honesty && (sample_size * honesty_fraction < 1.0 || sample_size * (1.0 - honesty_fraction) < 1.0) {
        return Err(ForestError::InfeasibleHonestyFraction {
            honesty_fraction,
            sample_fraction: options.sample_fraction,
            num_rows,
        });
    }
    Ok(())
}
