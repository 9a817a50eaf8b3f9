use super::error::{invalid, AlignError, AlignResult};
use std::ops::{Index, IndexMut};

/// Dense row-major matrix backed by a single flat buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    n_row: usize,
    n_col: usize,
    data: Vec<T>,
}

/// Similarity scores: rows index signal A, columns index signal B.
pub type SimMatrix = Matrix<f64>;

impl<T: Clone> Matrix<T> {
    pub fn filled(n_row: usize, n_col: usize, value: T) -> Self {
        Self {
            n_row,
            n_col,
            data: vec![value; n_row * n_col],
        }
    }
}

impl<T> Matrix<T> {
    /// Fills the matrix cell by cell in row-major order.
    pub fn from_fn<F>(n_row: usize, n_col: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(n_row * n_col);
        for i in 0..n_row {
            for j in 0..n_col {
                data.push(f(i, j));
            }
        }
        Self { n_row, n_col, data }
    }

    pub fn from_vec(n_row: usize, n_col: usize, data: Vec<T>) -> AlignResult<Self> {
        if data.len() != n_row * n_col {
            return Err(AlignError::DimensionMismatch(format!(
                "buffer of {} values cannot back a {}x{} matrix",
                data.len(),
                n_row,
                n_col
            )));
        }
        Ok(Self { n_row, n_col, data })
    }

    pub fn n_row(&self) -> usize {
        self.n_row
    }

    pub fn n_col(&self) -> usize {
        self.n_col
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.n_row, self.n_col)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.data[i * self.n_col..(i + 1) * self.n_col]
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, T> {
        self.data.chunks(self.n_col.max(1))
    }

    #[inline]
    fn offset(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.n_row && j < self.n_col);
        i * self.n_col + j
    }
}

impl<T: Copy> Matrix<T> {
    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.n_col {
            for i in 0..self.n_row {
                data.push(self[(i, j)]);
            }
        }
        Self {
            n_row: self.n_col,
            n_col: self.n_row,
            data,
        }
    }
}

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.data[self.offset(i, j)]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        let offset = self.offset(i, j);
        &mut self.data[offset]
    }
}

impl Matrix<f64> {
    pub fn from_rows(rows: &[Vec<f64>]) -> AlignResult<Self> {
        let n_col = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != n_col) {
            return Err(AlignError::DimensionMismatch(
                "matrix rows must have the same length".into(),
            ));
        }
        Self::from_vec(rows.len(), n_col, rows.concat())
    }

    /// Entry with the largest magnitude, sign preserved.
    pub fn max_abs_value(&self) -> Option<f64> {
        self.data
            .iter()
            .copied()
            .reduce(|best, x| if x.abs() > best.abs() { x } else { best })
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Checks the invariants every alignment relies on: non-empty and finite.
    pub fn validate_scores(&self) -> AlignResult<()> {
        if self.n_row == 0 || self.n_col == 0 {
            return invalid(format!(
                "similarity matrix must be non-empty, got {}x{}",
                self.n_row, self.n_col
            ));
        }
        if let Some(pos) = self.data.iter().position(|x| !x.is_finite()) {
            return invalid(format!(
                "similarity matrix has a non-finite entry at ({}, {})",
                pos / self.n_col,
                pos % self.n_col
            ));
        }
        Ok(())
    }
}
