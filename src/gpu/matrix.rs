use std::sync::Arc;

use tracing::debug;

use super::context::GpuContext;
use super::kernels::{self, ElementOp};
use super::memory::DeviceBuffer;
use super::resident::Resident;
use super::vector::GpuColumnVector;
use crate::backend::Backend;
use crate::contract::{MatrixOps, VectorOps};
use crate::error::{MatrixError, Result};
use crate::reference::{ColumnVector, Matrix, kernels as scalar};
use crate::shape::Shape;

/// Dense row-major matrix computed with `wgpu` compute kernels.
///
/// Results of device kernels stay on the device until read. Operations
/// without a device kernel (`log`, both convolutions, `hadamard_product`,
/// `sum`, `set_diagonal`) download their operands, run on the reference
/// backend and wrap a host-resident result.
///
/// Dropping the value frees its device memory.
///
/// There is no `Index` impl: the data may only exist on the device, so
/// element access goes through the fallible [`MatrixOps::get`] and
/// [`MatrixOps::set`].
#[derive(Debug)]
pub struct GpuMatrix {
    rows: usize,
    cols: usize,
    data: Resident,
}

impl GpuMatrix {
    /// Zero-filled matrix on the shared context.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Ok(Self::zeros_in(GpuContext::shared()?, rows, cols))
    }

    /// Zero-filled matrix on `ctx`. Nothing is allocated on the device yet.
    #[must_use]
    pub fn zeros_in(ctx: Arc<GpuContext>, rows: usize, cols: usize) -> Self {
        Self::from_reference_in(ctx, Matrix::zeros(rows, cols))
    }

    /// Wraps a row-major buffer on the shared context.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        Self::from_vec_in(GpuContext::shared()?, rows, cols, data)
    }

    /// Wraps a row-major buffer on `ctx`.
    pub fn from_vec_in(
        ctx: Arc<GpuContext>,
        rows: usize,
        cols: usize,
        data: Vec<f32>,
    ) -> Result<Self> {
        Matrix::from_vec(rows, cols, data).map(|m| Self::from_reference_in(ctx, m))
    }

    /// Moves a reference matrix onto the shared context.
    pub fn from_reference(m: Matrix) -> Result<Self> {
        Ok(Self::from_reference_in(GpuContext::shared()?, m))
    }

    /// Moves a reference matrix onto `ctx`.
    #[must_use]
    pub fn from_reference_in(ctx: Arc<GpuContext>, m: Matrix) -> Self {
        let (rows, cols) = (m.rows(), m.cols());
        Self {
            rows,
            cols,
            data: Resident::from_host(ctx, m.into_vec()),
        }
    }

    /// Downloads into a reference matrix.
    pub fn to_reference(&self) -> Result<Matrix> {
        Matrix::from_vec(self.rows, self.cols, self.to_vec()?)
    }

    /// Context this matrix lives on.
    #[must_use]
    pub fn context(&self) -> &Arc<GpuContext> {
        self.data.context()
    }

    /// Whether a device copy currently exists.
    #[must_use]
    pub fn is_on_device(&self) -> bool {
        self.data.is_on_device()
    }

    /// Downloads the data and frees the device copy. The matrix stays usable.
    /// Calling it again is a no-op.
    pub fn release(&mut self) -> Result<()> {
        self.data.release()
    }

    pub(super) fn from_device(ctx: Arc<GpuContext>, shape: Shape, handle: DeviceBuffer) -> Self {
        Self {
            rows: shape.rows,
            cols: shape.cols,
            data: Resident::from_device(ctx, handle),
        }
    }

    fn with_handle(&self, shape: Shape, handle: DeviceBuffer) -> Self {
        Self::from_device(self.context().clone(), shape, handle)
    }

    fn on_host(&self, op: &'static str, f: impl FnOnce(Matrix) -> Result<Matrix>) -> Result<Self> {
        debug!(op, "no device kernel, computing on host");
        let out = f(self.to_reference()?)?;
        Ok(Self::from_reference_in(self.context().clone(), out))
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

    fn elementwise(&self, rhs: Option<&Self>, op: ElementOp, scalar: f32) -> Result<Self> {
        if let Some(rhs) = rhs {
            self.data.same_context(&rhs.data)?;
        }
        let a = self.data.buffer()?;
        let b = match rhs {
            Some(rhs) => rhs.data.buffer()?,
            None => None,
        };
        let handle = kernels::elementwise(
            self.context(),
            op,
            a.as_deref(),
            b.as_deref(),
            scalar,
            self.data.len(),
        )?;
        Ok(self.with_handle(self.shape(), handle))
    }

    fn check_same_shape(&self, rhs: &Self, op: &'static str) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(MatrixError::mismatch(op, self.shape(), rhs.shape()));
        }
        Ok(())
    }
}

impl MatrixOps for GpuMatrix {
    type Vector = GpuColumnVector;

    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    fn get(&self, row: usize, col: usize) -> Result<f32> {
        let i = self.offset(row, col)?;
        self.data.with_host(|h| h[i])
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let i = self.offset(row, col)?;
        self.data.host_mut()?[i] = value;
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        self.data.with_host(<[f32]>::to_vec)
    }

    fn add(&self, rhs: &Self) -> Result<Self> {
        self.check_same_shape(rhs, "add")?;
        self.elementwise(Some(rhs), ElementOp::Add, 0.0)
    }

    fn add_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::AddScalar, scalar)
    }

    fn subtract(&self, rhs: &Self) -> Result<Self> {
        self.check_same_shape(rhs, "subtract")?;
        self.elementwise(Some(rhs), ElementOp::Sub, 0.0)
    }

    fn subtract_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::AddScalar, -scalar)
    }

    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::ScalarSub, scalar)
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        if self.cols != rhs.rows {
            return Err(MatrixError::mismatch("multiply", self.shape(), rhs.shape()));
        }
        self.data.same_context(&rhs.data)?;
        let (a, b) = (self.data.buffer()?, rhs.data.buffer()?);
        let handle = kernels::matmul(
            self.context(),
            a.as_deref(),
            b.as_deref(),
            (self.rows, self.cols, rhs.cols),
        )?;
        Ok(self.with_handle(Shape::new(self.rows, rhs.cols), handle))
    }

    fn multiply_vector(&self, vector: &GpuColumnVector) -> Result<GpuColumnVector> {
        if self.cols != vector.len() {
            return Err(MatrixError::mismatch(
                "multiply_vector",
                self.shape(),
                Shape::column(vector.len()),
            ));
        }
        self.data.same_context(vector.resident())?;
        let (a, x) = (self.data.buffer()?, vector.resident().buffer()?);
        let handle = kernels::matvec(
            self.context(),
            a.as_deref(),
            x.as_deref(),
            (self.rows, self.cols),
        )?;
        Ok(GpuColumnVector::with_handle(self.context().clone(), handle))
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::Scale, scalar)
    }

    fn hadamard_product(&self, rhs: &Self) -> Result<Self> {
        self.check_same_shape(rhs, "hadamard_product")?;
        let rhs = rhs.to_reference()?;
        self.on_host("hadamard_product", |m| m.hadamard_product(&rhs))
    }

    fn transpose(&self) -> Result<Self> {
        let a = self.data.buffer()?;
        let handle = kernels::transpose(self.context(), a.as_deref(), (self.rows, self.cols))?;
        Ok(self.with_handle(self.shape().transposed(), handle))
    }

    fn sum(&self) -> Result<f32> {
        debug!(op = "sum", "no device kernel, computing on host");
        self.data.with_host(scalar::sum)
    }

    fn log(&self) -> Result<Self> {
        self.on_host("log", |m| m.log())
    }

    fn convolution(&self, kernel: &Self) -> Result<Self> {
        let kernel = kernel.to_reference()?;
        self.on_host("convolution", |m| m.convolution(&kernel))
    }

    fn convolution_full(&self, kernel: &Self) -> Result<Self> {
        let kernel = kernel.to_reference()?;
        self.on_host("convolution_full", |m| m.convolution_full(&kernel))
    }

    fn set_diagonal(&mut self, value: f32) -> Result<()> {
        if !self.shape().is_square() {
            return Err(MatrixError::mismatch(
                "set_diagonal",
                self.shape(),
                self.shape().transposed(),
            ));
        }
        debug!(op = "set_diagonal", "no device kernel, computing on host");
        let n = self.rows;
        let host = self.data.host_mut()?;
        for i in 0..n {
            host[i * n + i] = value;
        }
        Ok(())
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        scalar::fill_random(self.data.host_mut()?, seed, min, max)
    }

    fn unroll(&self) -> Result<GpuColumnVector> {
        Ok(GpuColumnVector::from_reference_in(
            self.context().clone(),
            ColumnVector::from_vec(self.to_vec()?),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> Option<Arc<GpuContext>> {
        GpuContext::shared().ok()
    }

    #[test]
    fn product_of_two_by_two() {
        let Some(ctx) = context() else { return };
        let a = GpuMatrix::from_vec_in(ctx.clone(), 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = GpuMatrix::from_vec_in(ctx, 2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        let c = a.multiply(&b).unwrap();
        assert!(c.is_on_device());
        assert_eq!(c.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn scalar_forms() {
        let Some(ctx) = context() else { return };
        let a = GpuMatrix::from_vec_in(ctx, 1, 3, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(a.subtract_scalar(1.0).unwrap().to_vec().unwrap(), vec![0.0, 1.0, 2.0]);
        assert_eq!(
            a.subtract_from_scalar(1.0).unwrap().to_vec().unwrap(),
            vec![0.0, -1.0, -2.0]
        );
        assert_eq!(a.scale(2.0).unwrap().to_vec().unwrap(), vec![2.0, 4.0, 6.0]);
        assert_eq!(a.add(&a).unwrap().to_vec().unwrap(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn transpose_on_device() {
        let Some(ctx) = context() else { return };
        let a = GpuMatrix::from_vec_in(ctx, 2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let t = a.transpose().unwrap();
        assert_eq!(t.shape(), Shape::new(3, 2));
        assert_eq!(t.to_vec().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.transpose().unwrap().to_vec().unwrap(), a.to_vec().unwrap());
    }

    #[test]
    fn mutation_invalidates_device_copy() {
        let Some(ctx) = context() else { return };
        let mut a = GpuMatrix::from_vec_in(ctx, 2, 2, vec![1.0; 4]).unwrap();
        let doubled = a.add(&a).unwrap();
        assert!(a.is_on_device());
        a.set(0, 0, 5.0).unwrap();
        assert!(!a.is_on_device());
        assert_eq!(a.add(&doubled).unwrap().get(0, 0).unwrap(), 7.0);
    }
}
