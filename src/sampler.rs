//! Sampler
//!
//! Randomized subsets of the data for a single tree: in-bag samples over rows or
//! clusters, block bootstrap draws for serially correlated rows, sub-samples for
//! confidence-interval groups, honesty splits and without-replacement draws.
//!
//! Every draw goes through the generator owned by the [`RandomSampler`], so the
//! order of calls made on one sampler fully determines its output.
use crate::constants::DRAW_SIMPLE_RATIO;
use crate::errors::ForestError;
use crate::options::{HonestyMethod, SamplingOptions, TreeOptions};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use std::collections::BTreeSet;

pub struct RandomSampler<'a> {
    rng: StdRng,
    options: &'a SamplingOptions,
}

impl<'a> RandomSampler<'a> {
    pub fn new(seed: u64, options: &'a SamplingOptions) -> Self {
        RandomSampler {
            rng: StdRng::seed_from_u64(seed),
            options,
        }
    }

    /// Number of sampling units: clusters when clusters are configured, rows otherwise.
    fn num_units(&self, num_rows: usize) -> usize {
        if self.options.is_clustered() {
            self.options.clusters.len()
        } else {
            num_rows
        }
    }

    /// Draw `floor(units * sample_fraction)` distinct rows, or cluster ids when
    /// clusters are configured.
    pub fn sample_clusters(&mut self, num_rows: usize, sample_fraction: f64) -> Vec<usize> {
        let num_samples = self.num_units(num_rows);
        let num_samples_inbag = (num_samples as f64 * sample_fraction) as usize;
        self.shuffle_and_split(num_samples, num_samples_inbag)
    }

    /// Block bootstrap over rows, or over cluster ids when clusters are configured.
    ///
    /// Returns the flattened sample and its blocks, see [`RandomSampler::block_and_split`].
    pub fn sample_cluster_blocks(
        &mut self,
        num_rows: usize,
        sample_fraction: f64,
        block_group_size: usize,
    ) -> (Vec<usize>, Vec<Vec<usize>>) {
        let num_samples = self.num_units(num_rows);
        self.block_and_split(num_samples, sample_fraction, block_group_size)
    }

    /// Uniformly permute `0..n_all` and keep the first `size` values.
    pub fn shuffle_and_split(&mut self, n_all: usize, size: usize) -> Vec<usize> {
        let mut samples: Vec<usize> = (0..n_all).collect();
        samples.shuffle(&mut self.rng);
        samples.truncate(size);
        samples
    }

    /// Draw overlapping blocks of consecutive indices from `0..n_all`.
    ///
    /// * `block_count = ceil(n_all^(1 / block_group_size))`
    /// * `block_size = floor(n_all / block_count)`
    /// * `ceil(block_size * sample_fraction)` blocks are drawn, each starting at a
    ///   uniform offset in `0..=n_all - block_size`.
    ///
    /// Returns the concatenated blocks and the blocks themselves.
    pub fn block_and_split(
        &mut self,
        n_all: usize,
        sample_fraction: f64,
        block_group_size: usize,
    ) -> (Vec<usize>, Vec<Vec<usize>>) {
        if n_all == 0 || block_group_size == 0 {
            return (Vec::new(), Vec::new());
        }
        let block_count = ceil_root(n_all, block_group_size);
        let block_size = n_all / block_count;
        let block_sample_num = (block_size as f64 * sample_fraction).ceil() as usize;

        let blocks: Vec<Vec<usize>> = (0..block_sample_num)
            .map(|_| {
                let start = self.rng.gen_range(0..=n_all - block_size);
                (start..start + block_size).collect()
            })
            .collect();
        (blocks.concat(), blocks)
    }

    /// Keep a random `ceil(|samples| * sample_fraction)` subset of `samples`.
    pub fn subsample(&mut self, samples: &[usize], sample_fraction: f64) -> Vec<usize> {
        let mut shuffled = samples.to_vec();
        shuffled.shuffle(&mut self.rng);
        shuffled.truncate(ceil_count(samples.len(), sample_fraction));
        shuffled
    }

    /// Like [`RandomSampler::subsample`], also returning the complement as out-of-bag samples.
    pub fn subsample_with_oob(&mut self, samples: &[usize], sample_fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let mut subsamples = samples.to_vec();
        subsamples.shuffle(&mut self.rng);
        let oob_samples = subsamples.split_off(ceil_count(samples.len(), sample_fraction));
        (subsamples, oob_samples)
    }

    /// Keep a random subset of exactly `subsample_size` elements (or all of them
    /// if there are fewer).
    pub fn subsample_with_size(&mut self, samples: &[usize], subsample_size: usize) -> Vec<usize> {
        let mut shuffled = samples.to_vec();
        shuffled.shuffle(&mut self.rng);
        shuffled.truncate(subsample_size);
        shuffled
    }

    /// Sub-sample whole blocks of a CI group's shared half-sample.
    ///
    /// Keeps `round(|blocks| * sample_fraction)` randomly chosen blocks, restores
    /// their order by first element and returns them flattened alongside the
    /// kept blocks.
    pub fn subsample_for_ci_group(
        &mut self,
        blocks: &[Vec<usize>],
        sample_fraction: f64,
    ) -> (Vec<usize>, Vec<Vec<usize>>) {
        let mut shuffled_blocks = blocks.to_vec();
        shuffled_blocks.shuffle(&mut self.rng);
        let block_subsample_size = (shuffled_blocks.len() as f64 * sample_fraction).round() as usize;
        shuffled_blocks.truncate(block_subsample_size);
        shuffled_blocks.sort_by_key(|block| block.first().copied());
        (shuffled_blocks.concat(), shuffled_blocks)
    }

    /// Split an in-bag sample into structure and estimation halves.
    ///
    /// The policy is chosen by `options.honesty_method` and the split size by
    /// `options.honesty_fraction`. Every input element lands in exactly one half.
    /// With no block structure, `samples` is treated as one block.
    pub fn honesty_split(
        &mut self,
        samples: &[usize],
        blocks: &[Vec<usize>],
        options: &TreeOptions,
    ) -> (Vec<usize>, Vec<usize>) {
        let fraction = options.honesty_fraction;
        let single;
        let blocks = if blocks.is_empty() {
            single = [samples.to_vec()];
            &single[..]
        } else {
            blocks
        };
        match options.honesty_method {
            HonestyMethod::Shuffle => self.subsample_with_oob(samples, fraction),
            HonestyMethod::Alternate => split_alternate(blocks, fraction),
            HonestyMethod::Positional => split_positional(blocks, fraction),
            HonestyMethod::Window => self.split_window(blocks, fraction),
            HonestyMethod::WithinBlock => self.split_within_block(blocks, fraction),
        }
    }

    // Window length comes from the first block and is shared by all blocks.
    fn split_window(&mut self, blocks: &[Vec<usize>], fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let mut subsamples = Vec::new();
        let mut oob_samples = Vec::new();
        let window_size = ceil_count(blocks[0].len(), fraction);
        for block in blocks {
            if window_size >= block.len() {
                subsamples.extend_from_slice(block);
            } else {
                let start = self.rng.gen_range(0..=block.len() - window_size);
                subsamples.extend_from_slice(&block[start..start + window_size]);
                oob_samples.extend_from_slice(&block[..start]);
                oob_samples.extend_from_slice(&block[start + window_size..]);
            }
        }
        (subsamples, oob_samples)
    }

    fn split_within_block(&mut self, blocks: &[Vec<usize>], fraction: f64) -> (Vec<usize>, Vec<usize>) {
        let mut subsamples = Vec::new();
        let mut oob_samples = Vec::new();
        let block_subsample_size = ceil_count(blocks[0].len(), fraction);
        for block in blocks {
            let mut shuffled_block = block.clone();
            shuffled_block.shuffle(&mut self.rng);
            let (sub, oob) = shuffled_block.split_at(block_subsample_size.min(block.len()));
            subsamples.extend_from_slice(sub);
            oob_samples.extend_from_slice(oob);
        }
        (subsamples, oob_samples)
    }

    /// Draw `num_samples` distinct values from `0..max`, none of them in `skip`.
    ///
    /// Small draws use rejection sampling, larger ones a partial Fisher-Yates shuffle.
    pub fn draw(&mut self, max: usize, skip: &BTreeSet<usize>, num_samples: usize) -> Result<Vec<usize>, ForestError> {
        let num_skipped = skip.range(..max).count();
        let available = max - num_skipped;
        if num_samples > available {
            return Err(ForestError::InsufficientDrawDomain {
                requested: num_samples,
                available,
            });
        }
        if num_samples < max / DRAW_SIMPLE_RATIO {
            Ok(self.draw_simple(max, skip, num_samples, available))
        } else {
            Ok(self.draw_fisher_yates(max, skip, num_samples))
        }
    }

    fn draw_simple(&mut self, max: usize, skip: &BTreeSet<usize>, num_samples: usize, available: usize) -> Vec<usize> {
        let mut selected = vec![false; max];
        let mut result = Vec::with_capacity(num_samples);
        while result.len() < num_samples {
            let mut draw = self.rng.gen_range(0..available);
            // Skip values are visited in ascending order.
            for skip_value in skip.range(..max) {
                if draw >= *skip_value {
                    draw += 1;
                }
            }
            if !selected[draw] {
                selected[draw] = true;
                result.push(draw);
            }
        }
        result
    }

    fn draw_fisher_yates(&mut self, max: usize, skip: &BTreeSet<usize>, num_samples: usize) -> Vec<usize> {
        let mut result: Vec<usize> = (0..max).filter(|v| !skip.contains(v)).collect();
        for i in 0..num_samples {
            let j = self.rng.gen_range(i..result.len());
            result.swap(i, j);
        }
        result.truncate(num_samples);
        result
    }

    /// A single Poisson draw with the given mean. A mean of zero always yields zero.
    pub fn sample_poisson(&mut self, mean: usize) -> usize {
        if mean == 0 {
            return 0;
        }
        Poisson::new(mean as f64).map_or(0, |distribution| distribution.sample(&mut self.rng) as usize)
    }

    /// Expand cluster ids to rows, drawing at most `samples_per_cluster` rows from
    /// each cluster. Without clusters the input already holds rows.
    pub fn sample_from_clusters(&mut self, clusters: &[usize]) -> Vec<usize> {
        if !self.options.is_clustered() {
            return clusters.to_vec();
        }
        let options = self.options;
        let mut samples = Vec::new();
        for cluster in clusters {
            let cluster_samples = &options.clusters[*cluster];
            if cluster_samples.len() <= options.samples_per_cluster {
                samples.extend_from_slice(cluster_samples);
            } else {
                let subsamples = self.subsample_with_size(cluster_samples, options.samples_per_cluster);
                samples.extend(subsamples);
            }
        }
        samples
    }

    /// Expand cluster ids to every row of each cluster.
    pub fn get_samples_in_clusters(&self, clusters: &[usize]) -> Vec<usize> {
        if !self.options.is_clustered() {
            return clusters.to_vec();
        }
        clusters
            .iter()
            .flat_map(|cluster| self.options.clusters[*cluster].iter().copied())
            .collect()
    }
}

fn split_alternate(blocks: &[Vec<usize>], fraction: f64) -> (Vec<usize>, Vec<usize>) {
    let mut subsamples = Vec::new();
    let mut oob_samples = Vec::new();
    for block in blocks {
        let total = block.len();
        let subsample_size = ceil_count(total, fraction);
        // Anything needed beyond half the block is taken from its head.
        let head = subsample_size.saturating_sub(total / 2);
        subsamples.extend_from_slice(&block[..head]);
        let alternating = if head == 0 { 2 * subsample_size } else { total - head };
        for (offset, value) in block[head..].iter().enumerate() {
            if offset < alternating && offset % 2 == 0 {
                subsamples.push(*value);
            } else {
                oob_samples.push(*value);
            }
        }
    }
    (subsamples, oob_samples)
}

fn split_positional(blocks: &[Vec<usize>], fraction: f64) -> (Vec<usize>, Vec<usize>) {
    let mut subsamples = Vec::new();
    let mut oob_samples = Vec::new();
    for block in blocks {
        let (head, tail) = block.split_at(ceil_count(block.len(), fraction));
        subsamples.extend_from_slice(head);
        oob_samples.extend_from_slice(tail);
    }
    (subsamples, oob_samples)
}

/// `ceil(n * fraction)`, capped at `n`.
fn ceil_count(n: usize, fraction: f64) -> usize {
    ((n as f64 * fraction).ceil() as usize).min(n)
}

/// Smallest `r` with `r^k >= n`, for `n >= 1` and `k >= 1`.
fn ceil_root(n: usize, k: usize) -> usize {
    let exponent = u32::try_from(k).unwrap_or(u32::MAX);
    let covers = |r: usize| r.checked_pow(exponent).map_or(true, |p| p >= n);
    let mut root = ((n as f64).powf(1.0 / k as f64).ceil() as usize).max(1);
    while root > 1 && covers(root - 1) {
        root -= 1;
    }
    while !covers(root) {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    fn assert_partition(input: &[usize], sub: &[usize], oob: &[usize]) {
        let mut union = sub.to_vec();
        union.extend_from_slice(oob);
        assert_eq!(sorted(union), sorted(input.to_vec()));
    }

    fn synthetic_blocks() -> Vec<Vec<Vec<usize>>> {
        vec![
            vec![(0..10).collect()],
            vec![(0..10).collect(), (20..30).collect(), (5..15).collect()],
            vec![vec![3, 4, 5, 6, 7], vec![], vec![9, 10, 11, 12, 13]],
            vec![vec![42]],
            vec![(0..7).collect(), (50..57).collect()],
        ]
    }

    #[test]
    fn test_ceil_root() {
        assert_eq!(ceil_root(100, 2), 10);
        assert_eq!(ceil_root(101, 2), 11);
        assert_eq!(ceil_root(1000, 3), 10);
        assert_eq!(ceil_root(7, 1), 7);
        assert_eq!(ceil_root(1, 4), 1);
        assert_eq!(ceil_root(usize::MAX, 2), 1 << 32);
    }

    #[test]
    fn test_shuffle_and_split() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(42, &options);
        let samples = sampler.shuffle_and_split(50, 20);
        assert_eq!(samples.len(), 20);
        assert!(samples.iter().all(|s| *s < 50));
        let unique: BTreeSet<usize> = samples.iter().copied().collect();
        assert_eq!(unique.len(), 20);
    }

    #[test]
    fn test_same_seed_same_draws() {
        let options = SamplingOptions::default();
        let mut a = RandomSampler::new(7, &options);
        let mut b = RandomSampler::new(7, &options);
        assert_eq!(a.block_and_split(200, 0.5, 2), b.block_and_split(200, 0.5, 2));
        let tree_options = TreeOptions::new(true, 0.5, HonestyMethod::Window).unwrap();
        let blocks: Vec<Vec<usize>> = vec![(0..20).collect(), (40..60).collect()];
        let samples = blocks.concat();
        assert_eq!(
            a.honesty_split(&samples, &blocks, &tree_options),
            b.honesty_split(&samples, &blocks, &tree_options)
        );
    }

    #[test]
    fn test_block_and_split() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(1, &options);
        let (samples, blocks) = sampler.block_and_split(100, 0.5, 2);
        assert_eq!(samples.len(), 50);
        assert_eq!(blocks.len(), 5);
        for block in &blocks {
            assert_eq!(block.len(), 10);
            assert!(block.windows(2).all(|w| w[1] == w[0] + 1));
            assert!(*block.last().unwrap() < 100);
        }
        assert_eq!(samples, blocks.concat());
    }

    #[test]
    fn test_block_and_split_degenerate() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(1, &options);
        assert_eq!(sampler.block_and_split(0, 0.5, 2), (Vec::new(), Vec::new()));
        // One block per row.
        let (samples, blocks) = sampler.block_and_split(10, 0.5, 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_subsample() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(3, &options);
        let samples: Vec<usize> = (100..140).collect();
        let sub = sampler.subsample(&samples, 0.25);
        assert_eq!(sub.len(), 10);
        assert!(sub.iter().all(|s| samples.contains(s)));

        let (sub, oob) = sampler.subsample_with_oob(&samples, 0.5);
        assert_eq!(sub.len(), 20);
        assert_eq!(oob.len(), 20);
        assert_partition(&samples, &sub, &oob);

        let odd: Vec<usize> = (0..9).collect();
        let (sub, oob) = sampler.subsample_with_oob(&odd, 0.5);
        assert_eq!(sub.len(), 5);
        assert_partition(&odd, &sub, &oob);
    }

    #[test]
    fn test_subsample_with_size() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(3, &options);
        let samples: Vec<usize> = (0..30).collect();
        let sub = sampler.subsample_with_size(&samples, 7);
        assert_eq!(sub.len(), 7);
        assert_eq!(sorted(sub.clone()).windows(2).filter(|w| w[0] == w[1]).count(), 0);
        assert_eq!(sampler.subsample_with_size(&samples, 100).len(), 30);
    }

    #[test]
    fn test_subsample_for_ci_group() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(11, &options);
        let blocks: Vec<Vec<usize>> = (0..10).map(|b| (b * 10..b * 10 + 10).collect()).collect();
        let (sub, sub_blocks) = sampler.subsample_for_ci_group(&blocks, 0.4);
        assert_eq!(sub_blocks.len(), 4);
        assert_eq!(sub.len(), 40);
        assert!(sub_blocks.windows(2).all(|w| w[0][0] <= w[1][0]));
        assert!(sub_blocks.iter().all(|b| blocks.contains(b)));
        assert_eq!(sub, sub_blocks.concat());

        // Fractions above one keep every block.
        let (_, all_blocks) = sampler.subsample_for_ci_group(&blocks, 1.2);
        assert_eq!(all_blocks, blocks);
    }

    #[test]
    fn test_honesty_split_partitions_every_method() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(5, &options);
        for tag in 0..5usize {
            for fraction in [0.2, 0.5, 0.75] {
                let tree_options = TreeOptions::new(true, fraction, HonestyMethod::try_from(tag).unwrap()).unwrap();
                for blocks in synthetic_blocks() {
                    let samples = blocks.concat();
                    let (sub, oob) = sampler.honesty_split(&samples, &blocks, &tree_options);
                    assert_partition(&samples, &sub, &oob);
                }
                // No block structure at all.
                let samples: Vec<usize> = (0..13).collect();
                let (sub, oob) = sampler.honesty_split(&samples, &[], &tree_options);
                assert_partition(&samples, &sub, &oob);
                assert!(!sub.is_empty());
            }
        }
    }

    #[test]
    fn test_honesty_alternate() {
        let block: Vec<usize> = (0..8).collect();
        let (sub, oob) = split_alternate(&[block.clone()], 0.25);
        assert_eq!(sub, vec![0, 2]);
        assert_eq!(oob, vec![1, 3, 4, 5, 6, 7]);

        let (sub, oob) = split_alternate(&[block], 0.75);
        assert_eq!(sub, vec![0, 1, 2, 4, 6]);
        assert_eq!(oob, vec![3, 5, 7]);
    }

    #[test]
    fn test_honesty_positional() {
        let blocks: Vec<Vec<usize>> = vec![(10..20).collect(), (30..34).collect()];
        let (sub, oob) = split_positional(&blocks, 0.5);
        assert_eq!(sub, vec![10, 11, 12, 13, 14, 30, 31]);
        assert_eq!(oob, vec![15, 16, 17, 18, 19, 32, 33]);
    }

    #[test]
    fn test_honesty_window() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(9, &options);
        let blocks: Vec<Vec<usize>> = vec![(0..10).collect(), (100..110).collect(), (200..204).collect()];
        let samples = blocks.concat();
        let tree_options = TreeOptions::new(true, 0.5, HonestyMethod::Window).unwrap();
        let (sub, oob) = sampler.honesty_split(&samples, &blocks, &tree_options);
        // Window of five in the long blocks, the short block is kept whole.
        assert_eq!(sub.len(), 14);
        assert_eq!(oob.len(), 10);
        assert!(sub[..5].windows(2).all(|w| w[1] == w[0] + 1));
        assert!(sub[5..10].windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(&sub[10..], &[200, 201, 202, 203]);
    }

    #[test]
    fn test_honesty_within_block() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(9, &options);
        let blocks: Vec<Vec<usize>> = vec![(0..10).collect(), (100..110).collect()];
        let samples = blocks.concat();
        let tree_options = TreeOptions::new(true, 0.5, HonestyMethod::WithinBlock).unwrap();
        let (sub, oob) = sampler.honesty_split(&samples, &blocks, &tree_options);
        assert_eq!(sub.len(), 10);
        assert!(sub[..5].iter().all(|s| *s < 10));
        assert!(sub[5..].iter().all(|s| *s >= 100));
        assert_partition(&samples, &sub, &oob);
    }

    #[test]
    fn test_draw() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(13, &options);
        let skip: BTreeSet<usize> = [0, 3, 50, 99].into_iter().collect();
        // Rejection sampling and Fisher-Yates.
        for num_samples in [4, 60, 96] {
            let result = sampler.draw(100, &skip, num_samples).unwrap();
            assert_eq!(result.len(), num_samples);
            assert!(result.iter().all(|r| *r < 100 && !skip.contains(r)));
            let unique: BTreeSet<usize> = result.iter().copied().collect();
            assert_eq!(unique.len(), num_samples);
        }
        assert!(matches!(
            sampler.draw(100, &skip, 97),
            Err(ForestError::InsufficientDrawDomain {
                requested: 97,
                available: 96
            })
        ));
        assert!(sampler.draw(10, &BTreeSet::new(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_sample_poisson() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(17, &options);
        assert_eq!(sampler.sample_poisson(0), 0);
        let n = 2000;
        let total: usize = (0..n).map(|_| sampler.sample_poisson(4)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 4.0).abs() < 0.3, "mean {}", mean);
    }

    #[test]
    fn test_sample_clusters() {
        let options = SamplingOptions::new(2, vec![vec![0, 1, 2], vec![3], vec![4, 5], vec![6, 7, 8, 9]]);
        let mut sampler = RandomSampler::new(19, &options);
        let clusters = sampler.sample_clusters(10, 0.5);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|c| *c < 4));

        let all: Vec<usize> = (0..4).collect();
        let rows = sampler.sample_from_clusters(&all);
        // Clusters larger than the cap contribute exactly the cap.
        assert_eq!(rows.len(), 2 + 1 + 2 + 2);
        assert!(rows[..2].iter().all(|r| *r <= 2));
        assert_eq!(rows[2], 3);
        assert_eq!(&rows[3..5], &[4, 5]);
        assert_eq!(sampler.get_samples_in_clusters(&[3, 1]), vec![6, 7, 8, 9, 3]);
    }

    #[test]
    fn test_unclustered_passthrough() {
        let options = SamplingOptions::default();
        let mut sampler = RandomSampler::new(19, &options);
        assert_eq!(sampler.sample_clusters(10, 0.5).len(), 5);
        assert_eq!(sampler.sample_from_clusters(&[4, 2]), vec![4, 2]);
        assert_eq!(sampler.get_samples_in_clusters(&[4, 2]), vec![4, 2]);
    }
}
