//! Logical shape of a matrix or vector.

use core::fmt;

/// Row and column extents of a dense value.
///
/// Column vectors of length `n` have shape `n x 1`, row vectors `1 x n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
}

impl Shape {
    /// Creates a `rows x cols` shape.
    #[must_use]
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Shape of a column vector of length `len`.
    #[must_use]
    pub const fn column(len: usize) -> Self {
        Self { rows: len, cols: 1 }
    }

    /// Shape of a row vector of length `len`.
    #[must_use]
    pub const fn row(len: usize) -> Self {
        Self { rows: 1, cols: len }
    }

    /// Total number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether the shape holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the shape has as many rows as columns.
    #[must_use]
    pub const fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// The shape with rows and columns swapped.
    #[must_use]
    pub const fn transposed(&self) -> Self {
        Self {
            rows: self.cols,
            cols: self.rows,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}
