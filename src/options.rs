//! Options
//!
//! Configuration structures consumed by the forest trainer, the random sampler
//! and the tree grower. Options are built once by the caller and are read-only
//! for the duration of a training call.
use crate::constants::{
    DEFAULT_ALPHA, DEFAULT_BLOCK_SIZE, DEFAULT_CI_GROUP_SIZE, DEFAULT_HONESTY_FRACTION, DEFAULT_MIN_NODE_SIZE,
    DEFAULT_NUM_TREES, DEFAULT_SAMPLE_FRACTION, DEFAULT_SEED,
};
use crate::errors::ForestError;
use crate::utils::{validate_float_parameter, validate_open_float_parameter, validate_positive_usize_parameter};
use hashbrown::HashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Policy used to split a tree's in-bag blocks into a structure half and an
/// estimation half when honesty is enabled.
///
/// Serialized as its integer tag.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(try_from = "usize", into = "usize")]
pub enum HonestyMethod {
    /// 0: ignore the blocks, shuffle every row and split by prefix.
    #[default]
    Shuffle,
    /// 1: alternate even and odd positions inside each block.
    Alternate,
    /// 2: head of each block to structure, tail to estimation.
    Positional,
    /// 3: a contiguous window at a random offset inside each block.
    Window,
    /// 4: random rows without replacement inside each block.
    WithinBlock,
}

impl TryFrom<usize> for HonestyMethod {
    type Error = ForestError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HonestyMethod::Shuffle),
            1 => Ok(HonestyMethod::Alternate),
            2 => Ok(HonestyMethod::Positional),
            3 => Ok(HonestyMethod::Window),
            4 => Ok(HonestyMethod::WithinBlock),
            v => Err(ForestError::InvalidHonestyMethod(v)),
        }
    }
}

impl From<HonestyMethod> for usize {
    fn from(method: HonestyMethod) -> Self {
        match method {
            HonestyMethod::Shuffle => 0,
            HonestyMethod::Alternate => 1,
            HonestyMethod::Positional => 2,
            HonestyMethod::Window => 3,
            HonestyMethod::WithinBlock => 4,
        }
    }
}

/// Options for growing a single tree.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(default)]
pub struct TreeOptions {
    /// Split the in-bag sample into disjoint structure and estimation halves.
    pub honesty: bool,
    /// Fraction of the in-bag sample used to grow the tree structure.
    pub honesty_fraction: f64,
    /// How the honesty split treats block structure.
    pub honesty_method: HonestyMethod,
    /// Number of candidate split variables per node, `None` for the grower's default.
    pub mtry: Option<usize>,
    /// Target minimum number of observations in a leaf.
    pub min_node_size: usize,
    /// Maximum imbalance of a split, as a fraction of the parent node.
    pub alpha: f64,
    /// Penalty applied to imbalanced splits.
    pub imbalance_penalty: f64,
    /// Prune leaves left empty by the estimation half.
    pub honesty_prune_leaves: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        TreeOptions {
            honesty: true,
            honesty_fraction: DEFAULT_HONESTY_FRACTION,
            honesty_method: HonestyMethod::Shuffle,
            mtry: None,
            min_node_size: DEFAULT_MIN_NODE_SIZE,
            alpha: DEFAULT_ALPHA,
            imbalance_penalty: 0.0,
            honesty_prune_leaves: true,
        }
    }
}

impl TreeOptions {
    pub fn new(honesty: bool, honesty_fraction: f64, honesty_method: HonestyMethod) -> Result<Self, ForestError> {
        let options = TreeOptions {
            honesty,
            honesty_fraction,
            honesty_method,
            ..Default::default()
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ForestError> {
        validate_open_float_parameter(self.honesty_fraction, 0.0, 1.0, "honesty_fraction")?;
        validate_float_parameter(self.alpha, 0.0, 0.25, "alpha")?;
        validate_float_parameter(self.imbalance_penalty, 0.0, f64::INFINITY, "imbalance_penalty")
    }
}

/// Cluster configuration for the sampler.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(default)]
pub struct SamplingOptions {
    /// Cap on the number of rows drawn from a single cluster.
    pub samples_per_cluster: usize,
    /// Row indices of each cluster, indexed by cluster id. Empty when rows are
    /// sampled individually.
    pub clusters: Vec<Vec<usize>>,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        SamplingOptions {
            samples_per_cluster: usize::MAX,
            clusters: Vec::new(),
        }
    }
}

impl SamplingOptions {
    pub fn new(samples_per_cluster: usize, clusters: Vec<Vec<usize>>) -> Self {
        SamplingOptions {
            samples_per_cluster,
            clusters,
        }
    }

    /// Build clusters from a per-row cluster label.
    ///
    /// Cluster ids are assigned in order of first appearance of each label, and
    /// rows keep their original order inside a cluster.
    pub fn from_cluster_labels(samples_per_cluster: usize, labels: &[usize]) -> Self {
        let mut ids: HashMap<usize, usize> = HashMap::new();
        let mut clusters: Vec<Vec<usize>> = Vec::new();
        for (row, label) in labels.iter().enumerate() {
            let id = *ids.entry(*label).or_insert_with(|| {
                clusters.push(Vec::new());
                clusters.len() - 1
            });
            clusters[id].push(row);
        }
        SamplingOptions {
            samples_per_cluster,
            clusters,
        }
    }

    pub fn is_clustered(&self) -> bool {
        !self.clusters.is_empty()
    }
}

/// Options for training a forest.
#[derive(Clone, Serialize, Deserialize, PartialEq, Debug)]
#[serde(default)]
pub struct ForestOptions {
    /// Number of trees requested. Only whole CI groups are trained.
    pub num_trees: usize,
    /// Number of trees sharing one half-sample for variance estimation.
    pub ci_group_size: usize,
    /// Fraction of rows (or clusters) drawn for each tree.
    pub sample_fraction: f64,
    /// Number of worker threads, `None` for all available cores.
    pub num_threads: Option<usize>,
    /// Seed of the whole training call.
    pub seed: u64,
    /// Draw contiguous blocks of rows instead of individual rows.
    pub block_bootstrap: bool,
    /// Exponent used to derive the block count in block bootstrap mode.
    pub nonoverlapping_block_size: usize,
    pub tree_options: TreeOptions,
    pub sampling_options: SamplingOptions,
}

impl Default for ForestOptions {
    fn default() -> Self {
        ForestOptions {
            num_trees: DEFAULT_NUM_TREES,
            ci_group_size: DEFAULT_CI_GROUP_SIZE,
            sample_fraction: DEFAULT_SAMPLE_FRACTION,
            num_threads: None,
            seed: DEFAULT_SEED,
            block_bootstrap: false,
            nonoverlapping_block_size: DEFAULT_BLOCK_SIZE,
            tree_options: TreeOptions::default(),
            sampling_options: SamplingOptions::default(),
        }
    }
}

impl ForestOptions {
    /// Forest options
    ///
    /// * `num_trees` - Number of trees to train.
    /// * `ci_group_size` - Trees per confidence-interval group. 1 disables CI groups.
    /// * `sample_fraction` - Fraction of rows or clusters drawn per tree. Must be at most
    ///   0.5 when `ci_group_size` is larger than 1.
    /// * `num_threads` - Worker threads. Results are reproducible for a fixed thread count.
    /// * `seed` - Seed for all randomness in the training call.
    /// * `block_bootstrap` - Sample contiguous blocks of rows.
    /// * `nonoverlapping_block_size` - Block count exponent in block bootstrap mode.
    /// * `tree_options` - Options forwarded to the tree grower.
    /// * `sampling_options` - Cluster configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_trees: usize,
        ci_group_size: usize,
        sample_fraction: f64,
        num_threads: Option<usize>,
        seed: u64,
        block_bootstrap: bool,
        nonoverlapping_block_size: usize,
        tree_options: TreeOptions,
        sampling_options: SamplingOptions,
    ) -> Result<Self, ForestError> {
        let options = ForestOptions {
            num_trees,
            ci_group_size,
            sample_fraction,
            num_threads,
            seed,
            block_bootstrap,
            nonoverlapping_block_size,
            tree_options,
            sampling_options,
        };
        options.validate()?;
        Ok(options)
    }

    /// Check the options independently of any data.
    pub fn validate(&self) -> Result<(), ForestError> {
        validate_positive_usize_parameter(self.num_trees, "num_trees")?;
        validate_positive_usize_parameter(self.ci_group_size, "ci_group_size")?;
        validate_positive_usize_parameter(self.nonoverlapping_block_size, "nonoverlapping_block_size")?;
        if let Some(num_threads) = self.num_threads {
            validate_positive_usize_parameter(num_threads, "num_threads")?;
        }
        validate_float_parameter(self.sample_fraction, f64::MIN_POSITIVE, 1.0, "sample_fraction")?;
        if self.ci_group_size > 1 {
            validate_float_parameter(self.sample_fraction, 0.0, 0.5, "sample_fraction")?;
        }
        self.tree_options.validate()
    }

    /// Number of CI groups trained; trailing trees that do not fill a group are dropped.
    pub fn num_groups(&self) -> usize {
        self.num_trees / self.ci_group_size
    }

    /// Exponent passed to block sampling: the block size in block bootstrap
    /// mode, the CI group size otherwise.
    pub fn block_group_size(&self) -> usize {
        if self.block_bootstrap {
            self.nonoverlapping_block_size
        } else {
            self.ci_group_size
        }
    }

    /// Worker thread count, falling back to the available parallelism.
    pub fn resolved_num_threads(&self) -> usize {
        match self.num_threads {
            Some(num_threads) => num_threads,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    // Set methods for parameters

    /// Set the number of trees.
    pub fn set_num_trees(mut self, num_trees: usize) -> Self {
        self.num_trees = num_trees;
        self
    }

    /// Set the confidence-interval group size.
    pub fn set_ci_group_size(mut self, ci_group_size: usize) -> Self {
        self.ci_group_size = ci_group_size;
        self
    }

    /// Set the per-tree sample fraction.
    pub fn set_sample_fraction(mut self, sample_fraction: f64) -> Self {
        self.sample_fraction = sample_fraction;
        self
    }

    /// Set the number of threads.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the seed.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable block bootstrap with the given block count exponent.
    pub fn set_block_bootstrap(mut self, block_bootstrap: bool, nonoverlapping_block_size: usize) -> Self {
        self.block_bootstrap = block_bootstrap;
        self.nonoverlapping_block_size = nonoverlapping_block_size;
        self
    }

    /// Set the tree options.
    pub fn set_tree_options(mut self, tree_options: TreeOptions) -> Self {
        self.tree_options = tree_options;
        self
    }

    /// Set the sampling options.
    pub fn set_sampling_options(mut self, sampling_options: SamplingOptions) -> Self {
        self.sampling_options = sampling_options;
        self
    }
}

/// IO
pub trait OptionsIO: Serialize + DeserializeOwned + Sized {
    /// Save options as a json object to a file.
    ///
    /// * `path` - Path to save options.
    fn save_options<P: AsRef<Path>>(&self, path: P) -> Result<(), ForestError> {
        fs::write(path, self.json_dump()?).map_err(|e| ForestError::UnableToWrite(e.to_string()))
    }

    /// Dump options as a json object
    fn json_dump(&self) -> Result<String, ForestError> {
        serde_json::to_string(self).map_err(|e| ForestError::UnableToWrite(e.to_string()))
    }

    /// Load options from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, ForestError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| ForestError::UnableToRead(e.to_string()))
    }

    /// Load options from a path to a json object.
    ///
    /// * `path` - Path to load options from.
    fn load_options<P: AsRef<Path>>(path: P) -> Result<Self, ForestError> {
        let json_str = fs::read_to_string(path).map_err(|e| ForestError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl OptionsIO for ForestOptions {}
impl OptionsIO for TreeOptions {}
impl OptionsIO for SamplingOptions {}
