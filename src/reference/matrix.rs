use core::ops::{Index, IndexMut};

use super::kernels;
use super::vector::ColumnVector;
use crate::backend::Backend;
use crate::contract::{MatrixOps, VectorOps};
use crate::error::{MatrixError, Result};
use crate::shape::Shape;

/// Dense row-major matrix computed with plain loops.
///
/// `Index<(row, col)>` panics out of bounds; [`MatrixOps::get`] returns an
/// error instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Zero-filled `rows x cols` matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wraps a row-major buffer without copying it.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MatrixError::InvalidData {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(MatrixError::InvalidData {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Square matrix with `value` on the diagonal.
    #[must_use]
    pub fn identity(n: usize, value: f32) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = value;
        }
        m
    }

    /// Row-major elements.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major elements.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Gives up the row-major buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Elements of row `r`.
    ///
    /// # Panics
    ///
    /// If `r >= rows`.
    #[must_use]
    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(MatrixError::IndexOutOfBounds {
                row,
                col,
                shape: self.shape(),
            });
        }
        Ok(row * self.cols + col)
    }

    fn zip_with(
        &self,
        rhs: &Self,
        op: &'static str,
        f: fn(&[f32], &[f32], &mut [f32]),
    ) -> Result<Self> {
        if self.shape() != rhs.shape() {
            return Err(MatrixError::mismatch(op, self.shape(), rhs.shape()));
        }
        let mut out = Self::zeros(self.rows, self.cols);
        f(&self.data, &rhs.data, &mut out.data);
        Ok(out)
    }

    fn map_scalar(&self, s: f32, f: fn(&[f32], f32, &mut [f32])) -> Self {
        let mut out = Self::zeros(self.rows, self.cols);
        f(&self.data, s, &mut out.data);
        out
    }

    pub(crate) fn check_product(&self, rhs: Shape, op: &'static str) -> Result<()> {
        if self.cols != rhs.rows {
            return Err(MatrixError::mismatch(op, self.shape(), rhs));
        }
        Ok(())
    }

    pub(crate) fn check_valid_kernel(&self, kernel: Shape) -> Result<()> {
        if kernel.is_empty() || kernel.rows > self.rows || kernel.cols > self.cols {
            return Err(MatrixError::mismatch("convolution", self.shape(), kernel));
        }
        Ok(())
    }

    pub(crate) fn check_full_kernel(&self, kernel: Shape) -> Result<()> {
        if kernel.is_empty() {
            return Err(MatrixError::mismatch(
                "convolution_full",
                self.shape(),
                kernel,
            ));
        }
        Ok(())
    }

    pub(crate) fn check_square(&self) -> Result<()> {
        if !self.shape().is_square() {
            return Err(MatrixError::mismatch(
                "set_diagonal",
                self.shape(),
                self.shape().transposed(),
            ));
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}",
            self.shape()
        );
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f32 {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}",
            self.shape()
        );
        &mut self.data[row * self.cols + col]
    }
}

impl MatrixOps for Matrix {
    type Vector = ColumnVector;

    fn backend(&self) -> Backend {
        Backend::Reference
    }

    fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    fn get(&self, row: usize, col: usize) -> Result<f32> {
        Ok(self.data[self.offset(row, col)?])
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data[i] = value;
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
        let mut out = Self::zeros(self.rows, self.cols);
        kernels::scalar_sub(scalar, &self.data, &mut out.data);
        Ok(out)
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        self.check_product(rhs.shape(), "multiply")?;
        let data = kernels::matmul(&self.data, &rhs.data, self.rows, self.cols, rhs.cols);
        Ok(Self {
            rows: self.rows,
            cols: rhs.cols,
            data,
        })
    }

    fn multiply_vector(&self, vector: &ColumnVector) -> Result<ColumnVector> {
        self.check_product(Shape::column(vector.len()), "multiply_vector")?;
        Ok(ColumnVector::from_vec(kernels::matvec(
            &self.data,
            vector.as_slice(),
            self.rows,
            self.cols,
        )))
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::scale))
    }

    fn hadamard_product(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "hadamard_product", kernels::mul)
    }

    fn transpose(&self) -> Result<Self> {
        Ok(Self {
            rows: self.cols,
            cols: self.rows,
            data: kernels::transpose(&self.data, self.rows, self.cols),
        })
    }

    fn sum(&self) -> Result<f32> {
        Ok(kernels::sum(&self.data))
    }

    fn log(&self) -> Result<Self> {
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: kernels::ln(&self.data),
        })
    }

    fn convolution(&self, kernel: &Self) -> Result<Self> {
        self.check_valid_kernel(kernel.shape())?;
        Ok(Self {
            rows: self.rows - kernel.rows + 1,
            cols: self.cols - kernel.cols + 1,
            data: kernels::convolve_valid(
                &self.data,
                (self.rows, self.cols),
                &kernel.data,
                (kernel.rows, kernel.cols),
            ),
        })
    }

    fn convolution_full(&self, kernel: &Self) -> Result<Self> {
        self.check_full_kernel(kernel.shape())?;
        Ok(Self {
            rows: self.rows + kernel.rows - 1,
            cols: self.cols + kernel.cols - 1,
            data: kernels::convolve_full(
                &self.data,
                (self.rows, self.cols),
                &kernel.data,
                (kernel.rows, kernel.cols),
            ),
        })
    }

    fn set_diagonal(&mut self, value: f32) -> Result<()> {
        self.check_square()?;
        let n = self.rows;
        for i in 0..n {
            self.data[i * n + i] = value;
        }
        Ok(())
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        kernels::fill_random(&mut self.data, seed, min, max)
    }

    fn unroll(&self) -> Result<ColumnVector> {
        Ok(ColumnVector::from_vec(self.data.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[f32]]) -> Matrix {
        Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn product_of_two_by_two() {
        let a = m(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = m(&[&[5.0, 6.0], &[7.0, 8.0]]);
        assert_eq!(
            a.multiply(&b).unwrap(),
            m(&[&[19.0, 22.0], &[43.0, 50.0]])
        );
    }

    #[test]
    fn rectangular_product_and_matvec() {
        let a = m(&[&[1.0, 0.0, 2.0], &[0.0, 1.0, 3.0]]);
        let b = m(&[&[1.0], &[2.0], &[3.0]]);
        assert_eq!(a.multiply(&b).unwrap(), m(&[&[7.0], &[11.0]]));

        let v = ColumnVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(a.multiply_vector(&v).unwrap().as_slice(), &[7.0, 11.0]);
    }

    #[test]
    fn inner_dimension_mismatch_is_rejected() {
        let a = Matrix::zeros(3, 4);
        let b = Matrix::zeros(5, 2);
        assert!(matches!(
            a.multiply(&b),
            Err(MatrixError::DimensionMismatch { op: "multiply", .. })
        ));
    }

    #[test]
    fn scalar_subtraction_has_both_orders() {
        let a = m(&[&[1.0, 2.0]]);
        assert_eq!(a.subtract_scalar(5.0).unwrap(), m(&[&[-4.0, -3.0]]));
        assert_eq!(a.subtract_from_scalar(5.0).unwrap(), m(&[&[4.0, 3.0]]));
    }

    #[test]
    fn transpose_swaps_axes() {
        let a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let t = a.transpose().unwrap();
        assert_eq!(t.shape(), Shape::new(3, 2));
        assert_eq!(t[(2, 1)], 6.0);
        assert_eq!(t.transpose().unwrap(), a);
    }

    #[test]
    fn convolution_sizes() {
        let input = Matrix::zeros(5, 4);
        let kernel = Matrix::zeros(3, 2);
        assert_eq!(
            input.convolution(&kernel).unwrap().shape(),
            Shape::new(3, 3)
        );
        assert_eq!(
            input.convolution_full(&kernel).unwrap().shape(),
            Shape::new(7, 5)
        );
        assert!(kernel.convolution(&input).is_err());
    }

    #[test]
    fn diagonal_requires_square() {
        let mut sq = Matrix::zeros(3, 3);
        sq.set_diagonal(2.0).unwrap();
        assert_eq!(sq, Matrix::identity(3, 2.0));

        let mut rect = Matrix::zeros(2, 3);
        assert!(rect.set_diagonal(1.0).is_err());
        assert_eq!(rect, Matrix::zeros(2, 3));
    }

    #[test]
    fn bounds_are_checked() {
        let mut a = Matrix::zeros(2, 2);
        assert!(matches!(
            a.get(2, 0),
            Err(MatrixError::IndexOutOfBounds { row: 2, col: 0, .. })
        ));
        assert!(a.set(0, 2, 1.0).is_err());
        a.set(1, 1, 4.0).unwrap();
        assert_eq!(a.get(1, 1).unwrap(), 4.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: [&[f32]; 2] = [&[1.0, 2.0], &[3.0]];
        assert!(matches!(
            Matrix::from_rows(&rows),
            Err(MatrixError::InvalidData {
                expected: 2,
                actual: 1
            })
        ));
        assert!(Matrix::from_vec(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn log_and_sum() {
        let a = m(&[&[1.0, core::f32::consts::E]]);
        let l = a.log().unwrap();
        assert!((l[(0, 1)] - 1.0).abs() < 1e-6);
        assert_eq!(l[(0, 0)], 0.0);
        assert_eq!(m(&[&[1.0, 2.0], &[3.0, 4.0]]).sum().unwrap(), 10.0);
    }
}
