//! # Reference Backend
//!
//! Direct nested-loop implementation of [`MatrixOps`](crate::contract::MatrixOps)
//! and [`VectorOps`](crate::contract::VectorOps). It is the correctness oracle
//! for the other backends and the fallback for operations they do not
//! accelerate.
//!
//! Matrix product is the textbook `O(R*C*K)` triple loop with no blocking or
//! tiling.
//!
//! ## Example
//!
//! ```rust
//! use briny_linalg::contract::MatrixOps;
//! use briny_linalg::matrix;
//!
//! let a = matrix!([[1.0, 2.0], [3.0, 4.0]]);
//! let b = matrix!([[5.0, 6.0], [7.0, 8.0]]);
//! assert_eq!(a.multiply(&b).unwrap(), matrix!([[19.0, 22.0], [43.0, 50.0]]));
//! ```

pub(crate) mod kernels;
mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::{ColumnVector, RowVector};

/// Builds a reference [`Matrix`] from nested row literals.
///
/// # Panics
///
/// If the rows have different lengths.
#[macro_export]
macro_rules! matrix {
    ([ $( [ $( $x:expr ),* $(,)? ] ),+ $(,)? ]) => {{
        let rows: ::std::vec::Vec<::std::vec::Vec<f32>> =
            ::std::vec![ $( ::std::vec![ $( ($x) as f32 ),* ] ),+ ];
        match $crate::reference::Matrix::from_rows(&rows) {
            Ok(m) => m,
            Err(e) => panic!("ragged matrix literal: {e}"),
        }
    }};
}

#[cfg(test)]
mod tests {
    use crate::contract::MatrixOps;
    use crate::shape::Shape;

    #[test]
    fn macro_builds_row_major() {
        let m = matrix!([[1, 2, 3], [4, 5, 6]]);
        assert_eq!(m.shape(), Shape::new(2, 3));
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "ragged matrix literal")]
    fn macro_rejects_ragged_rows() {
        let _ = matrix!([[1.0, 2.0], [3.0]]);
    }
}
