//! A value that is a matrix, a column vector, or a list of matrices.
//!
//! Layer stacks pass [`Tensor`] through heterogeneous layers: dense layers see
//! vectors and matrices, convolutional layers see one matrix per channel.
//! Arithmetic requires both operands to carry the same tag and, for matrix
//! lists, the same number of channels.

use rayon::prelude::*;

use crate::contract::{MatrixOps, VectorOps};
use crate::error::{MatrixError, Result};

/// Tagged union over the array kinds of one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor<M: MatrixOps> {
    /// A single matrix.
    Matrix(M),
    /// A single column vector.
    Vector(M::Vector),
    /// One matrix per channel, in order.
    Matrices(Vec<M>),
}

impl<M: MatrixOps> Tensor<M> {
    /// Name of the tag, as used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Matrix(_) => "matrix",
            Self::Vector(_) => "vector",
            Self::Matrices(_) => "matrices",
        }
    }

    /// Elementwise sum. Matrix lists add per channel.
    pub fn add(&self, rhs: &Self) -> Result<Self> {
        match (self, rhs) {
            (Self::Matrix(a), Self::Matrix(b)) => a.add(b).map(Self::Matrix),
            (Self::Vector(a), Self::Vector(b)) => a.add(b).map(Self::Vector),
            (Self::Matrices(a), Self::Matrices(b)) => {
                per_channel(a, b, M::add).map(Self::Matrices)
            }
            (a, b) => Err(kind_mismatch(a, b)),
        }
    }

    /// Vectors multiply elementwise, matrices by matrix product, and matrix
    /// lists by per-channel matrix product.
    pub fn multiply(&self, rhs: &Self) -> Result<Self> {
        match (self, rhs) {
            (Self::Matrix(a), Self::Matrix(b)) => a.multiply(b).map(Self::Matrix),
            (Self::Vector(a), Self::Vector(b)) => a.multiply(b).map(Self::Vector),
            (Self::Matrices(a), Self::Matrices(b)) => {
                per_channel(a, b, M::multiply).map(Self::Matrices)
            }
            (a, b) => Err(kind_mismatch(a, b)),
        }
    }

    /// The matrix, if this is one.
    #[must_use]
    pub const fn as_matrix(&self) -> Option<&M> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// The vector, if this is one.
    #[must_use]
    pub const fn as_vector(&self) -> Option<&M::Vector> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// The channels, if this is a matrix list.
    #[must_use]
    pub fn as_matrices(&self) -> Option<&[M]> {
        match self {
            Self::Matrices(ms) => Some(ms),
            _ => None,
        }
    }

    /// Moves out the matrix, if this is one.
    #[must_use]
    pub fn into_matrix(self) -> Option<M> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Moves out the vector, if this is one.
    #[must_use]
    pub fn into_vector(self) -> Option<M::Vector> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// Moves out the matrices. A single matrix becomes a one-channel list.
    #[must_use]
    pub fn into_matrices(self) -> Option<Vec<M>> {
        match self {
            Self::Matrix(m) => Some(vec![m]),
            Self::Matrices(ms) => Some(ms),
            Self::Vector(_) => None,
        }
    }

    /// Row-major contents as one column vector. Matrix lists are unrolled
    /// channel by channel and concatenated.
    pub fn flatten(&self) -> Result<M::Vector> {
        match self {
            Self::Matrix(m) => m.unroll(),
            Self::Vector(v) => M::Vector::concat(core::slice::from_ref(v)),
            Self::Matrices(ms) => {
                let parts = ms.iter().map(M::unroll).collect::<Result<Vec<_>>>()?;
                M::Vector::concat(&parts)
            }
        }
    }
}

impl<M: MatrixOps> From<Vec<M>> for Tensor<M> {
    fn from(channels: Vec<M>) -> Self {
        Self::Matrices(channels)
    }
}

fn kind_mismatch<M: MatrixOps>(a: &Tensor<M>, b: &Tensor<M>) -> MatrixError {
    MatrixError::TensorKindMismatch {
        left: a.kind(),
        right: b.kind(),
    }
}

fn per_channel<M: MatrixOps>(
    a: &[M],
    b: &[M],
    op: fn(&M, &M) -> Result<M>,
) -> Result<Vec<M>> {
    if a.len() != b.len() {
        return Err(MatrixError::ChannelCountMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    a.par_iter().zip(b).map(|(x, y)| op(x, y)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;
    use crate::reference::{ColumnVector, Matrix};
    use crate::simd::SimdMatrix;

    #[test]
    fn vectors_multiply_elementwise() {
        let a: Tensor<Matrix> = Tensor::Vector(ColumnVector::from_vec(vec![1.0, 2.0, 3.0]));
        let b = Tensor::Vector(ColumnVector::from_vec(vec![4.0, 5.0, 6.0]));
        let c = a.multiply(&b).unwrap().into_vector().unwrap();
        assert_eq!(c.as_slice(), &[4.0, 10.0, 18.0]);
    }

    #[test]
    fn matrices_multiply_by_product() {
        let a = Tensor::Matrix(matrix!([[1, 2], [3, 4]]));
        let b = Tensor::Matrix(matrix!([[5, 6], [7, 8]]));
        assert_eq!(
            a.multiply(&b).unwrap().as_matrix(),
            Some(&matrix!([[19, 22], [43, 50]]))
        );
    }

    #[test]
    fn channels_multiply_in_parallel() {
        let a = Tensor::from(vec![
            SimdMatrix::from(matrix!([[1, 0], [0, 1]])),
            SimdMatrix::from(matrix!([[2, 0], [0, 2]])),
        ]);
        let b = Tensor::from(vec![
            SimdMatrix::from(matrix!([[1, 2], [3, 4]])),
            SimdMatrix::from(matrix!([[1, 2], [3, 4]])),
        ]);
        let out = a.multiply(&b).unwrap();
        let out = out.as_matrices().unwrap();
        assert_eq!(out[0].as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(out[1].as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn channel_counts_must_match() {
        let a = Tensor::from(vec![Matrix::zeros(1, 1); 2]);
        let b = Tensor::from(vec![Matrix::zeros(1, 1); 3]);
        assert!(matches!(
            a.add(&b),
            Err(MatrixError::ChannelCountMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn tags_must_match() {
        let a = Tensor::Matrix(Matrix::zeros(1, 1));
        let b = Tensor::Vector(ColumnVector::zeros(1));
        assert!(matches!(
            a.multiply(&b),
            Err(MatrixError::TensorKindMismatch {
                left: "matrix",
                right: "vector",
            })
        ));
    }

    #[test]
    fn flatten_concatenates_channels() {
        let t = Tensor::from(vec![matrix!([[1, 2], [3, 4]]), matrix!([[5, 6]])]);
        assert_eq!(t.flatten().unwrap().as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let empty: Tensor<Matrix> = Tensor::from(Vec::new());
        assert!(matches!(empty.flatten(), Err(MatrixError::Empty { .. })));
    }

    #[test]
    fn projections_are_pure() {
        let t = Tensor::Matrix(matrix!([[1, 2]]));
        assert!(t.as_vector().is_none());
        assert_eq!(t.clone().into_matrices().unwrap().len(), 1);
        assert_eq!(t.into_matrix().unwrap().as_slice(), &[1.0, 2.0]);
    }
}
