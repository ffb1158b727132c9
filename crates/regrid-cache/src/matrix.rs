//! Sparse interpolation weight matrices.

use std::error::Error;
use std::fmt;

/// One non-zero matrix entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triplet {
    /// Row index (output point).
    pub row: u64,
    /// Column index (input point).
    pub col: u64,
    /// The interpolation weight.
    pub weight: f64,
}

/// A triplet sitting outside the declared matrix shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutOfBoundsTriplet {
    /// Declared row count.
    pub rows: usize,
    /// Declared column count.
    pub cols: usize,
    /// The offending `(row, col)` pair.
    pub at: (u64, u64),
}

impl fmt::Display for OutOfBoundsTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "triplet ({}, {}) outside {}x{} matrix",
            self.at.0, self.at.1, self.rows, self.cols
        )
    }
}

impl Error for OutOfBoundsTriplet {}

/// A sparse linear operator mapping input-grid values to output-grid
/// values.
///
/// `rows` is the number of output points, `cols` the number of input
/// points. Matrices handed out by the caches are shared and must be
/// treated as immutable; a caller that needs a modified variant clones
/// first.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    triplets: Vec<Triplet>,
}

impl WeightMatrix {
    /// An all-zero matrix of the given shape.
    pub fn zero(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            triplets: Vec::new(),
        }
    }

    /// Construct from non-zero entries, checking every index against the
    /// shape.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfBoundsTriplet`] for the first entry outside the
    /// declared shape.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: Vec<Triplet>,
    ) -> Result<Self, OutOfBoundsTriplet> {
        for t in &triplets {
            if t.row >= rows as u64 || t.col >= cols as u64 {
                return Err(OutOfBoundsTriplet {
                    rows,
                    cols,
                    at: (t.row, t.col),
                });
            }
        }
        Ok(Self {
            rows,
            cols,
            triplets,
        })
    }

    /// Number of rows (output points).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (input points).
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The non-zero entries.
    pub fn triplets(&self) -> &[Triplet] {
        &self.triplets
    }

    /// Number of non-zero entries.
    pub fn triplet_count(&self) -> usize {
        self.triplets.len()
    }

    /// Apply the operator to an input vector.
    ///
    /// Returns `None` when the input length does not match the column
    /// count.
    pub fn apply(&self, input: &[f64]) -> Option<Vec<f64>> {
        if input.len() != self.cols {
            return None;
        }
        let mut out = vec![0.0; self.rows];
        for t in &self.triplets {
            out[t.row as usize] += t.weight * input[t.col as usize];
        }
        Some(out)
    }
}
