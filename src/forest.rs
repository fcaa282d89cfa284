//! Forest
//!
//! Container for a trained ensemble: the trees in training order plus the
//! metadata prediction needs.
use crate::errors::ForestError;

#[derive(Clone, PartialEq, Debug)]
pub struct Forest<T> {
    trees: Vec<T>,
    num_variables: usize,
    ci_group_size: usize,
}

impl<T> Forest<T> {
    pub fn new(trees: Vec<T>, num_variables: usize, ci_group_size: usize) -> Self {
        Forest {
            trees,
            num_variables,
            ci_group_size,
        }
    }

    /// Concatenate forests trained on the same data, in the given order.
    pub fn merge(forests: Vec<Forest<T>>) -> Result<Self, ForestError> {
        let mut forests = forests.into_iter();
        let Some(mut merged) = forests.next() else {
            return Err(ForestError::IncompatibleForests("no forests to merge".to_string()));
        };
        for forest in forests {
            if forest.num_variables != merged.num_variables {
                return Err(ForestError::IncompatibleForests(format!(
                    "num_variables {} does not match {}",
                    forest.num_variables, merged.num_variables
                )));
            }
            if forest.ci_group_size != merged.ci_group_size {
                return Err(ForestError::IncompatibleForests(format!(
                    "ci_group_size {} does not match {}",
                    forest.ci_group_size, merged.ci_group_size
                )));
            }
            merged.trees.extend(forest.trees);
        }
        Ok(merged)
    }

    pub fn trees(&self) -> &[T] {
        &self.trees
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of columns trees may split on.
    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn ci_group_size(&self) -> usize {
        self.ci_group_size
    }

    pub fn into_trees(self) -> Vec<T> {
        self.trees
    }
}
