use std::sync::Arc;

use tracing::debug;

use super::context::GpuContext;
use super::kernels::{self, ElementOp};
use super::matrix::GpuMatrix;
use super::memory::DeviceBuffer;
use super::resident::Resident;
use crate::backend::Backend;
use crate::contract::VectorOps;
use crate::error::{MatrixError, Result};
use crate::reference::{ColumnVector, kernels as scalar};
use crate::shape::Shape;

/// Dense column vector computed with `wgpu` compute kernels.
///
/// Elementwise add, subtract, the scalar forms and the outer product run on
/// the device. Elementwise multiply and the reductions run on the host.
/// Elements are read through [`VectorOps::get`]; there is no `Index` impl.
#[derive(Debug)]
pub struct GpuColumnVector {
    data: Resident,
}

impl GpuColumnVector {
    /// Zero-filled vector on the shared context.
    pub fn zeros(len: usize) -> Result<Self> {
        Ok(Self::zeros_in(GpuContext::shared()?, len))
    }

    /// Zero-filled vector on `ctx`.
    #[must_use]
    pub fn zeros_in(ctx: Arc<GpuContext>, len: usize) -> Self {
        Self::from_reference_in(ctx, ColumnVector::zeros(len))
    }

    /// Wraps a buffer on the shared context.
    pub fn from_vec(data: Vec<f32>) -> Result<Self> {
        Ok(Self::from_vec_in(GpuContext::shared()?, data))
    }

    /// Wraps a buffer on `ctx`.
    #[must_use]
    pub fn from_vec_in(ctx: Arc<GpuContext>, data: Vec<f32>) -> Self {
        Self {
            data: Resident::from_host(ctx, data),
        }
    }

    /// Moves a reference vector onto `ctx`.
    #[must_use]
    pub fn from_reference_in(ctx: Arc<GpuContext>, v: ColumnVector) -> Self {
        Self::from_vec_in(ctx, v.into_vec())
    }

    /// Downloads into a reference vector.
    pub fn to_reference(&self) -> Result<ColumnVector> {
        self.to_vec().map(ColumnVector::from_vec)
    }

    /// Context this vector lives on.
    #[must_use]
    pub fn context(&self) -> &Arc<GpuContext> {
        self.data.context()
    }

    /// Whether a device copy currently exists.
    #[must_use]
    pub fn is_on_device(&self) -> bool {
        self.data.is_on_device()
    }

    /// Downloads the data and frees the device copy.
    pub fn release(&mut self) -> Result<()> {
        self.data.release()
    }

    pub(super) fn with_handle(ctx: Arc<GpuContext>, handle: DeviceBuffer) -> Self {
        Self {
            data: Resident::from_device(ctx, handle),
        }
    }

    pub(super) fn resident(&self) -> &Resident {
        &self.data
    }

    fn check_len(&self, rhs: &Self, op: &'static str) -> Result<()> {
        if self.len() != rhs.len() {
            return Err(MatrixError::mismatch(
                op,
                Shape::column(self.len()),
                Shape::column(rhs.len()),
            ));
        }
        Ok(())
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
            self.len(),
        )?;
        Ok(Self::with_handle(self.context().clone(), handle))
    }
}

impl VectorOps for GpuColumnVector {
    type Matrix = GpuMatrix;

    fn backend(&self) -> Backend {
        Backend::Gpu
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: usize) -> Result<f32> {
        if index >= self.len() {
            return Err(MatrixError::IndexOutOfBounds {
                row: index,
                col: 0,
                shape: Shape::column(self.len()),
            });
        }
        self.data.with_host(|h| h[index])
    }

    fn set(&mut self, index: usize, value: f32) -> Result<()> {
        if index >= self.len() {
            return Err(MatrixError::IndexOutOfBounds {
                row: index,
                col: 0,
                shape: Shape::column(self.len()),
            });
        }
        self.data.host_mut()?[index] = value;
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        self.data.with_host(<[f32]>::to_vec)
    }

    fn add(&self, rhs: &Self) -> Result<Self> {
        self.check_len(rhs, "add")?;
        self.elementwise(Some(rhs), ElementOp::Add, 0.0)
    }

    fn add_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::AddScalar, scalar)
    }

    fn subtract(&self, rhs: &Self) -> Result<Self> {
        self.check_len(rhs, "subtract")?;
        self.elementwise(Some(rhs), ElementOp::Sub, 0.0)
    }

    fn subtract_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::AddScalar, -scalar)
    }

    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::ScalarSub, scalar)
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        self.check_len(rhs, "multiply")?;
        debug!(op = "multiply", "no device kernel, computing on host");
        let rhs = rhs.to_vec()?;
        let out = self.data.with_host(|a| {
            let mut out = vec![0.0; a.len()];
            scalar::mul(a, &rhs, &mut out);
            out
        })?;
        Ok(Self::from_vec_in(self.context().clone(), out))
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        self.elementwise(None, ElementOp::Scale, scalar)
    }

    fn outer_product(&self, rhs: &Self) -> Result<GpuMatrix> {
        self.data.same_context(&rhs.data)?;
        let (a, b) = (self.data.buffer()?, rhs.data.buffer()?);
        let (m, n) = (self.len(), rhs.len());
        let handle = kernels::matmul(self.context(), a.as_deref(), b.as_deref(), (m, 1, n))?;
        Ok(GpuMatrix::from_device(
            self.context().clone(),
            Shape::new(m, n),
            handle,
        ))
    }

    fn sum(&self) -> Result<f32> {
        self.data.with_host(scalar::sum)
    }

    fn max(&self) -> Result<f32> {
        if self.is_empty() {
            return Err(MatrixError::Empty { op: "max" });
        }
        self.data.with_host(scalar::max)
    }

    fn log(&self) -> Result<Self> {
        debug!(op = "log", "no device kernel, computing on host");
        let out = self.data.with_host(scalar::ln)?;
        Ok(Self::from_vec_in(self.context().clone(), out))
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        scalar::fill_random(self.data.host_mut()?, seed, min, max)
    }

    fn concat(parts: &[Self]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Err(MatrixError::Empty { op: "concat" });
        };
        let mut data = Vec::with_capacity(parts.iter().map(Self::len).sum());
        for part in parts {
            first.data.same_context(&part.data)?;
            part.data.with_host(|h| data.extend_from_slice(h))?;
        }
        Ok(Self::from_vec_in(first.context().clone(), data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MatrixOps;

    fn context() -> Option<Arc<GpuContext>> {
        GpuContext::shared().ok()
    }

    #[test]
    fn outer_product_on_device() {
        let Some(ctx) = context() else { return };
        let a = GpuColumnVector::from_vec_in(ctx.clone(), vec![1.0, 2.0, 3.0]);
        let b = GpuColumnVector::from_vec_in(ctx, vec![4.0, 5.0]);
        let m = a.outer_product(&b).unwrap();
        assert_eq!(m.shape(), Shape::new(3, 2));
        assert_eq!(m.to_vec().unwrap(), vec![4.0, 5.0, 8.0, 10.0, 12.0, 15.0]);
    }

    #[test]
    fn mismatched_lengths_fail_before_upload() {
        let Some(ctx) = context() else { return };
        let a = GpuColumnVector::zeros_in(ctx.clone(), 3);
        let b = GpuColumnVector::zeros_in(ctx, 4);
        assert!(matches!(
            a.add(&b),
            Err(MatrixError::DimensionMismatch { op: "add", .. })
        ));
        assert!(!a.is_on_device());
        assert!(!b.is_on_device());
    }

    #[test]
    fn concat_keeps_order() {
        let Some(ctx) = context() else { return };
        let a = GpuColumnVector::from_vec_in(ctx.clone(), vec![1.0, 2.0]);
        let b = GpuColumnVector::from_vec_in(ctx, vec![3.0]);
        let c = a.add(&a).unwrap();
        let joined = GpuColumnVector::concat(&[c, b]).unwrap();
        assert_eq!(joined.to_vec().unwrap(), vec![2.0, 4.0, 3.0]);
    }
}
