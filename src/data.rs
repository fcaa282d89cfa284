//! Data
//!
//! Read-only access to the training table. The trainer only needs the shape of
//! the data and which columns may not be split on; everything else is left to
//! the tree grower.
use std::collections::HashSet;

/// Read-only accessors the forest trainer expects from training data.
///
/// Implementations are shared by reference across worker threads, so they
/// must be `Sync` and must not mutate through `&self`.
pub trait Data: Sync {
    /// Number of rows (observations).
    fn num_rows(&self) -> usize;
    /// Number of columns, including outcome and treatment columns.
    fn num_cols(&self) -> usize;
    /// Columns that may not be used as split variables.
    fn disallowed_split_variables(&self) -> &HashSet<usize>;
}

/// Contiguous Column Major Matrix data container.
///
/// Holds a borrowed dense matrix of values in a single contiguous memory block,
/// plus the set of columns (outcome, treatment, weights) that trees must not
/// split on. Value access is left to the grower, which reads `data` directly.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f32`, `f64`).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
    disallowed_split_variables: HashSet<usize>,
}

impl<'a, T> Matrix<'a, T> {
    // Defaults to column major
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix {
            data,
            rows,
            cols,
            disallowed_split_variables: HashSet::new(),
        }
    }

    /// Mark columns that trees must not split on.
    pub fn with_disallowed_split_variables(mut self, columns: impl IntoIterator<Item = usize>) -> Self {
        self.disallowed_split_variables.extend(columns);
        self
    }
}

impl<T: Sync> Data for Matrix<'_, T> {
    fn num_rows(&self) -> usize {
        self.rows
    }

    fn num_cols(&self) -> usize {
        self.cols
    }

    fn disallowed_split_variables(&self) -> &HashSet<usize> {
        &self.disallowed_split_variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_accessors() {
        let v = vec![0.0; 12];
        let m = Matrix::new(&v, 4, 3).with_disallowed_split_variables([2]);
        assert_eq!(m.num_rows(), 4);
        assert_eq!(m.num_cols(), 3);
        assert!(m.disallowed_split_variables().contains(&2));
        assert_eq!(m.disallowed_split_variables().len(), 1);
    }
}
