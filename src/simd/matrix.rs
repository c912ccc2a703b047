use core::ops::{Index, IndexMut};

use super::kernels;
use super::vector::SimdColumnVector;
use crate::backend::Backend;
use crate::contract::MatrixOps;
use crate::error::{MatrixError, Result};
use crate::reference::{Matrix, kernels as scalar};
use crate::shape::Shape;

/// Dense row-major matrix computed with SIMD kernels.
///
/// Shares its storage layout with [`Matrix`]; the conversions in both
/// directions move the buffer without copying.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimdMatrix(Matrix);

impl SimdMatrix {
    /// Zero-filled `rows x cols` matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(Matrix::zeros(rows, cols))
    }

    /// Wraps a row-major buffer without copying it.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        Matrix::from_vec(rows, cols, data).map(Self)
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows<R: AsRef<[f32]>>(rows: &[R]) -> Result<Self> {
        Matrix::from_rows(rows).map(Self)
    }

    /// Row-major elements.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        self.0.as_slice()
    }

    /// Borrows the reference representation.
    #[must_use]
    pub fn as_reference(&self) -> &Matrix {
        &self.0
    }

    /// Moves into the reference representation.
    #[must_use]
    pub fn into_reference(self) -> Matrix {
        self.0
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
        let mut out = Matrix::zeros(self.rows(), self.cols());
        f(self.as_slice(), rhs.as_slice(), out.as_mut_slice());
        Ok(Self(out))
    }

    fn map_scalar(&self, s: f32, f: fn(&[f32], f32, &mut [f32])) -> Self {
        let mut out = Matrix::zeros(self.rows(), self.cols());
        f(self.as_slice(), s, out.as_mut_slice());
        Self(out)
    }
}

impl From<Matrix> for SimdMatrix {
    fn from(m: Matrix) -> Self {
        Self(m)
    }
}

impl From<SimdMatrix> for Matrix {
    fn from(m: SimdMatrix) -> Self {
        m.0
    }
}

impl Index<(usize, usize)> for SimdMatrix {
    type Output = f32;

    fn index(&self, at: (usize, usize)) -> &f32 {
        &self.0[at]
    }
}

impl IndexMut<(usize, usize)> for SimdMatrix {
    fn index_mut(&mut self, at: (usize, usize)) -> &mut f32 {
        &mut self.0[at]
    }
}

impl MatrixOps for SimdMatrix {
    type Vector = SimdColumnVector;

    fn backend(&self) -> Backend {
        Backend::Simd
    }

    fn shape(&self) -> Shape {
        self.0.shape()
    }

    fn get(&self, row: usize, col: usize) -> Result<f32> {
        self.0.get(row, col)
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        self.0.set(row, col, value)
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
        self.0.check_product(rhs.shape(), "multiply")?;
        let (m, k, n) = (self.rows(), self.cols(), rhs.cols());
        let bt = scalar::transpose(rhs.as_slice(), k, n);
        let mut out = Matrix::zeros(m, n);
        kernels::matmul_transposed(self.as_slice(), &bt, k, out.as_mut_slice());
        Ok(Self(out))
    }

    fn multiply_vector(&self, vector: &SimdColumnVector) -> Result<SimdColumnVector> {
        self.0
            .check_product(Shape::column(vector.len_inner()), "multiply_vector")?;
        let mut out = vec![0.0; self.rows()];
        kernels::matvec(self.as_slice(), vector.as_slice(), &mut out);
        Ok(SimdColumnVector::from_vec(out))
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        Ok(self.map_scalar(scalar, kernels::scale))
    }

    fn hadamard_product(&self, rhs: &Self) -> Result<Self> {
        self.zip_with(rhs, "hadamard_product", kernels::mul)
    }

    fn transpose(&self) -> Result<Self> {
        self.0.transpose().map(Self)
    }

    fn sum(&self) -> Result<f32> {
        Ok(kernels::sum(self.as_slice()))
    }

    fn log(&self) -> Result<Self> {
        self.0.log().map(Self)
    }

    fn convolution(&self, kernel: &Self) -> Result<Self> {
        self.0.convolution(&kernel.0).map(Self)
    }

    fn convolution_full(&self, kernel: &Self) -> Result<Self> {
        self.0.convolution_full(&kernel.0).map(Self)
    }

    fn set_diagonal(&mut self, value: f32) -> Result<()> {
        self.0.set_diagonal(value)
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        self.0.set_random(seed, min, max)
    }

    fn unroll(&self) -> Result<SimdColumnVector> {
        Ok(SimdColumnVector::from_vec(self.as_slice().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::VectorOps;

    fn pair(rows: usize, cols: usize) -> (Matrix, SimdMatrix) {
        let mut m = Matrix::zeros(rows, cols);
        m.set_random(7, -1.0, 1.0).unwrap();
        (m.clone(), SimdMatrix::from(m))
    }

    #[test]
    fn product_matches_reference() {
        for (m, k, n) in [(1, 1, 1), (2, 17, 3), (16, 16, 16), (5, 33, 9)] {
            let (a_ref, a) = pair(m, k);
            let (b_ref, b) = pair(k, n);
            let want = a_ref.multiply(&b_ref).unwrap();
            let got = a.multiply(&b).unwrap();
            assert_eq!(got.shape(), want.shape());
            for (x, y) in got.as_slice().iter().zip(want.as_slice()) {
                assert!((x - y).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn tuple_indexing() {
        let mut m = SimdMatrix::zeros(2, 3);
        m[(1, 2)] = 4.5;
        assert_eq!(m[(1, 2)], 4.5);
        assert_eq!(m.get(1, 2).unwrap(), m[(1, 2)]);
        assert_eq!(m.as_slice()[5], 4.5);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn tuple_indexing_panics_out_of_bounds() {
        let m = SimdMatrix::zeros(2, 2);
        let _ = m[(0, 2)];
    }

    #[test]
    fn two_by_two_product() {
        let a = SimdMatrix::from_rows(&[[1.0_f32, 2.0], [3.0, 4.0]]).unwrap();
        let b = SimdMatrix::from_rows(&[[5.0_f32, 6.0], [7.0, 8.0]]).unwrap();
        assert_eq!(a.multiply(&b).unwrap().as_slice(), &[19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn matvec_matches_reference() {
        let (a_ref, a) = pair(7, 37);
        let mut v = crate::reference::ColumnVector::zeros(37);
        v.set_random(3, 0.0, 2.0).unwrap();
        let want = a_ref.multiply_vector(&v).unwrap();
        let got = a.multiply_vector(&SimdColumnVector::from(v)).unwrap();
        for (x, y) in got.as_slice().iter().zip(want.as_slice()) {
            assert!((x - y).abs() < 1e-3);
        }
    }

    #[test]
    fn mismatches_are_rejected() {
        let a = SimdMatrix::zeros(3, 4);
        assert!(a.multiply(&SimdMatrix::zeros(5, 2)).is_err());
        assert!(a.add(&SimdMatrix::zeros(4, 3)).is_err());
        assert!(
            a.multiply_vector(&SimdColumnVector::zeros(3))
                .is_err()
        );
    }

    #[test]
    fn delegated_ops_agree_with_reference() {
        let (r, s) = pair(6, 5);
        assert_eq!(s.transpose().unwrap().as_reference(), &r.transpose().unwrap());
        let (kr, k) = pair(2, 3);
        assert_eq!(
            s.convolution(&k).unwrap().into_reference(),
            r.convolution(&kr).unwrap()
        );
        assert_eq!(s.backend(), Backend::Simd);
    }
}
