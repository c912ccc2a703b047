use core::ops::{Index, IndexMut};

use super::kernels;
use super::matrix::Matrix;
use crate::backend::Backend;
use crate::contract::VectorOps;
use crate::error::{MatrixError, Result};
use crate::shape::Shape;

/// Dense column vector (`n x 1`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnVector {
    data: Vec<f32>,
}

/// Dense row vector (`1 x n`).
///
/// Row vectors exist only on the reference backend. They are kept distinct
/// from [`ColumnVector`] so orientation errors surface as type errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowVector {
    data: Vec<f32>,
}

fn out_of_bounds(index: usize, shape: Shape) -> MatrixError {
    if shape.cols == 1 {
        MatrixError::IndexOutOfBounds {
            row: index,
            col: 0,
            shape,
        }
    } else {
        MatrixError::IndexOutOfBounds {
            row: 0,
            col: index,
            shape,
        }
    }
}

impl ColumnVector {
    /// Zero-filled vector of length `len`.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Wraps a buffer without copying it.
    #[must_use]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Elements in order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable elements.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Gives up the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Same elements as a row vector.
    #[must_use]
    pub fn transpose(self) -> RowVector {
        RowVector { data: self.data }
    }

    /// Column times row: the `len x rhs.len()` outer product.
    pub fn multiply_row(&self, rhs: &RowVector) -> Result<Matrix> {
        let data = kernels::outer(&self.data, &rhs.data);
        Matrix::from_vec(self.data.len(), rhs.data.len(), data)
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
        let mut out = Self::zeros(self.len());
        f(&self.data, &rhs.data, &mut out.data);
        Ok(out)
    }

    fn map_scalar(&self, s: f32, f: fn(&[f32], f32, &mut [f32])) -> Self {
        let mut out = Self::zeros(self.len());
        f(&self.data, s, &mut out.data);
        out
    }
}

impl Index<usize> for ColumnVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<usize> for ColumnVector {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}

impl VectorOps for ColumnVector {
    type Matrix = Matrix;

    fn backend(&self) -> Backend {
        Backend::Reference
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<f32> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| out_of_bounds(index, Shape::column(self.len())))
    }

    fn set(&mut self, index: usize, value: f32) -> Result<()> {
        let shape = Shape::column(self.len());
        let slot = self
            .data
            .get_mut(index)
            .ok_or_else(|| out_of_bounds(index, shape))?;
        *slot = value;
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.data.clone())
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
        let mut out = Self::zeros(self.len());
        kernels::scalar_sub(scalar, &self.data, &mut out.data);
        Ok(out)
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "multiply", kernels::mul)
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::scale))
    }

    fn outer_product(&self, rhs: &Self) -> Result<Matrix> {
        Matrix::from_vec(
            self.len(),
            rhs.len(),
            kernels::outer(&self.data, &rhs.data),
        )
    }

    fn sum(&self) -> Result<f32> {
        Ok(kernels::sum(&self.data))
    }

    fn max(&self) -> Result<f32> {
        if self.data.is_empty() {
            return Err(MatrixError::Empty { op: "max" });
        }
        Ok(kernels::max(&self.data))
    }

    fn log(&self) -> Result<Self> {
        Ok(Self::from_vec(kernels::ln(&self.data)))
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        kernels::fill_random(&mut self.data, seed, min, max)
    }

    fn concat(parts: &[Self]) -> Result<Self> {
        if parts.is_empty() {
            return Err(MatrixError::Empty { op: "concat" });
        }
        let mut data = Vec::with_capacity(parts.iter().map(Self::len).sum());
        for part in parts {
            data.extend_from_slice(&part.data);
        }
        Ok(Self { data })
    }
}

impl RowVector {
    /// Zero-filled vector of length `len`.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Wraps a buffer without copying it.
    #[must_use]
    pub fn from_vec(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads element `index`.
    pub fn get(&self, index: usize) -> Result<f32> {
        self.data
            .get(index)
            .copied()
            .ok_or_else(|| out_of_bounds(index, Shape::row(self.len())))
    }

    /// Writes element `index`.
    pub fn set(&mut self, index: usize, value: f32) -> Result<()> {
        let shape = Shape::row(self.len());
        let slot = self
            .data
            .get_mut(index)
            .ok_or_else(|| out_of_bounds(index, shape))?;
        *slot = value;
        Ok(())
    }

    /// Total of all elements.
    #[must_use]
    pub fn sum(&self) -> f32 {
        kernels::sum(&self.data)
    }

    /// Elements in order.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Same elements as a column vector.
    #[must_use]
    pub fn transpose(self) -> ColumnVector {
        ColumnVector { data: self.data }
    }
}

impl Index<usize> for RowVector {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.data[index]
    }
}

impl IndexMut<usize> for RowVector {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MatrixOps;

    fn v(data: &[f32]) -> ColumnVector {
        ColumnVector::from_vec(data.to_vec())
    }

    #[test]
    fn outer_product_shape_law() {
        let m = v(&[1.0, 2.0, 3.0]).outer_product(&v(&[4.0, 5.0])).unwrap();
        assert_eq!(m.shape(), Shape::new(3, 2));
        assert_eq!(m.as_slice(), &[4.0, 5.0, 8.0, 10.0, 12.0, 15.0]);
    }

    #[test]
    fn column_times_row_is_outer_product() {
        let col = v(&[1.0, 2.0, 3.0]);
        let row = RowVector::from_vec(vec![4.0, 5.0]);
        assert_eq!(
            col.multiply_row(&row).unwrap(),
            col.outer_product(&row.clone().transpose()).unwrap()
        );
    }

    #[test]
    fn length_mismatch_is_rejected_without_output() {
        let err = v(&[1.0, 2.0, 3.0]).add(&v(&[1.0; 4])).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::DimensionMismatch { op: "add", left, right }
                if left == Shape::column(3) && right == Shape::column(4)
        ));
    }

    #[test]
    fn scalar_minus_self() {
        let a = v(&[1.0, 2.0, 3.0]);
        assert_eq!(a.subtract_from_scalar(1.0).unwrap(), v(&[0.0, -1.0, -2.0]));
        assert_eq!(a.subtract_scalar(1.0).unwrap(), v(&[0.0, 1.0, 2.0]));
    }

    #[test]
    fn max_rejects_empty() {
        assert!(matches!(
            ColumnVector::zeros(0).max(),
            Err(MatrixError::Empty { op: "max" })
        ));
        assert_eq!(v(&[-1.0, 4.0, 2.0]).max().unwrap(), 4.0);
    }

    #[test]
    fn concat_keeps_order() {
        let joined = ColumnVector::concat(&[v(&[1.0]), v(&[2.0, 3.0]), v(&[])]).unwrap();
        assert_eq!(joined.as_slice(), &[1.0, 2.0, 3.0]);
        assert!(ColumnVector::concat(&[]).is_err());
    }

    #[test]
    fn row_vector_indexing_and_sum() {
        let mut r = RowVector::zeros(3);
        r.set(2, 5.0).unwrap();
        r[0] = 1.0;
        assert_eq!(r.sum(), 6.0);
        assert!(matches!(
            r.get(3),
            Err(MatrixError::IndexOutOfBounds { row: 0, col: 3, .. })
        ));
        assert_eq!(r.transpose().as_slice(), &[1.0, 0.0, 5.0]);
    }
}
