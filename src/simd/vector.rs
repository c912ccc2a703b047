use core::ops::{Index, IndexMut};

use super::kernels;
use super::matrix::SimdMatrix;
use crate::backend::Backend;
use crate::contract::VectorOps;
use crate::error::{MatrixError, Result};
use crate::reference::{ColumnVector, Matrix};
use crate::shape::Shape;

/// Dense column vector computed with SIMD kernels.
///
/// There is no SIMD row vector; request one through
/// [`crate::factory::row_vector`] and it fails with `Unsupported`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimdColumnVector(ColumnVector);

impl SimdColumnVector {
    /// Zero-filled vector of length `len`.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(ColumnVector::zeros(len))
    }

    /// Wraps a buffer without copying it.
    #[must_use]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self(ColumnVector::from_vec(data))
    }

    /// Elements in order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.0.as_slice()
    }

    /// Borrows the reference representation.
    #[must_use]
    pub fn as_reference(&self) -> &ColumnVector {
        &self.0
    }

    /// Moves into the reference representation.
    #[must_use]
    pub fn into_reference(self) -> ColumnVector {
        self.0
    }

    pub(crate) fn len_inner(&self) -> usize {
        self.0.len()
    }

    fn zip_with(
        &self,
        rhs: &Self,
        op: &'static str,
        f: fn(&[f32], &[f32], &mut [f32]),
    ) -> Result<Self> {
        if self.len() != rhs.len() {
            return Err(MatrixError::mismatch(
                op,
                Shape::column(self.len()),
                Shape::column(rhs.len()),
            ));
        }
        let mut out = vec![0.0; self.len()];
        f(self.as_slice(), rhs.as_slice(), &mut out);
        Ok(Self::from_vec(out))
    }

    fn map_scalar(&self, s: f32, f: fn(&[f32], f32, &mut [f32])) -> Self {
        let mut out = vec![0.0; self.len()];
        f(self.as_slice(), s, &mut out);
        Self::from_vec(out)
    }
}

impl From<ColumnVector> for SimdColumnVector {
    fn from(v: ColumnVector) -> Self {
        Self(v)
    }
}

impl From<SimdColumnVector> for ColumnVector {
    fn from(v: SimdColumnVector) -> Self {
        v.0
    }
}

impl Index<usize> for SimdColumnVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl IndexMut<usize> for SimdColumnVector {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}

impl VectorOps for SimdColumnVector {
    type Matrix = SimdMatrix;

    fn backend(&self) -> Backend {
        Backend::Simd
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, index: usize) -> Result<f32> {
        self.0.get(index)
    }

    fn set(&mut self, index: usize, value: f32) -> Result<()> {
        self.0.set(index, value)
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        self.0.to_vec()
    }

    fn add(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "add", kernels::add)
    }

    fn add_scalar(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::add_scalar))
    }

    fn subtract(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "subtract", kernels::sub)
    }

    fn subtract_scalar(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(-scalar, kernels::add_scalar))
    }

    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::scalar_sub))
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "multiply", kernels::mul)
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::scale))
    }

    fn outer_product(&self, rhs: &Self) -> Result<SimdMatrix> {
        let mut out = Matrix::zeros(self.len(), rhs.len());
        kernels::outer(self.as_slice(), rhs.as_slice(), out.as_mut_slice());
        Ok(SimdMatrix::from(out))
    }

    fn sum(&self) -> Result<f32> {
        Ok(kernels::sum(self.as_slice()))
    }

    fn max(&self) -> Result<f32> {
        if self.is_empty() {
            return Err(MatrixError::Empty { op: "max" });
        }
        Ok(kernels::max(self.as_slice()))
    }

    fn log(&self) -> Result<Self> {
        self.0.log().map(Self)
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        self.0.set_random(seed, min, max)
    }

    fn concat(parts: &[Self]) -> Result<Self> {
        if parts.is_empty() {
            return Err(MatrixError::Empty { op: "concat" });
        }
        let mut data = Vec::with_capacity(parts.iter().map(Self::len).sum());
        for part in parts {
            data.extend_from_slice(part.as_slice());
        }
        Ok(Self::from_vec(data))
    }
}
