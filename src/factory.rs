//! Runtime-polymorphic values and backend-aware constructors.
//!
//! [`DynMatrix`] and [`DynColumnVector`] wrap one concrete backend value and
//! implement the numeric contract by dispatching to it. Binary operations
//! require both operands on the same backend and fail with
//! [`MatrixError::BackendMismatch`] otherwise; nothing is converted
//! implicitly. Use [`DynMatrix::to_backend`] to move a value explicitly.
//!
//! # Example
//!
//! ```rust
//! use briny_linalg::backend::Backend;
//! use briny_linalg::contract::MatrixOps;
//! use briny_linalg::factory::DynMatrix;
//!
//! let a = DynMatrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0], Backend::Simd).unwrap();
//! let b = a.to_backend(Backend::Reference).unwrap();
//! assert_eq!(b.backend(), Backend::Reference);
//! assert_eq!(a.to_vec().unwrap(), b.to_vec().unwrap());
//! ```

use crate::backend::{Backend, default_backend};
use crate::contract::{MatrixOps, VectorOps};
use crate::error::{MatrixError, Result};
use crate::reference::{ColumnVector, Matrix, RowVector};
use crate::selector::recommended_backend_for_size;
use crate::shape::Shape;
use crate::simd::{SimdColumnVector, SimdMatrix};

#[cfg(feature = "wgpu")]
use crate::gpu::{GpuColumnVector, GpuMatrix};

/// A matrix on any backend.
#[derive(Debug)]
pub enum DynMatrix {
    /// Reference backend value.
    Reference(Matrix),
    /// SIMD backend value.
    Simd(SimdMatrix),
    /// GPU backend value.
    #[cfg(feature = "wgpu")]
    Gpu(GpuMatrix),
}

/// A column vector on any backend.
#[derive(Debug)]
pub enum DynColumnVector {
    /// Reference backend value.
    Reference(ColumnVector),
    /// SIMD backend value.
    Simd(SimdColumnVector),
    /// GPU backend value.
    #[cfg(feature = "wgpu")]
    Gpu(GpuColumnVector),
}

macro_rules! each {
    ($value:expr, $v:ident => $body:expr) => {
        match $value {
            Self::Reference($v) => $body,
            Self::Simd($v) => $body,
            #[cfg(feature = "wgpu")]
            Self::Gpu($v) => $body,
        }
    };
}

macro_rules! unary {
    ($value:expr, $method:ident ( $( $arg:expr ),* )) => {
        match $value {
            Self::Reference(v) => v.$method($( $arg ),*).map(Self::Reference),
            Self::Simd(v) => v.$method($( $arg ),*).map(Self::Simd),
            #[cfg(feature = "wgpu")]
            Self::Gpu(v) => v.$method($( $arg ),*).map(Self::Gpu),
        }
    };
}

macro_rules! binary {
    ($lhs:expr, $rhs:expr, $method:ident) => {
        match ($lhs, $rhs) {
            (Self::Reference(a), Self::Reference(b)) => a.$method(b).map(Self::Reference),
            (Self::Simd(a), Self::Simd(b)) => a.$method(b).map(Self::Simd),
            #[cfg(feature = "wgpu")]
            (Self::Gpu(a), Self::Gpu(b)) => a.$method(b).map(Self::Gpu),
            (a, b) => Err(MatrixError::BackendMismatch {
                left: a.backend(),
                right: b.backend(),
            }),
        }
    };
}

#[cfg(not(feature = "wgpu"))]
fn gpu_disabled<T>(op: &'static str) -> Result<T> {
    Err(MatrixError::Unsupported {
        op,
        backend: Backend::Gpu,
    })
}

impl DynMatrix {
    /// Moves a reference matrix onto `backend`.
    pub fn from_reference(m: Matrix, backend: Backend) -> Result<Self> {
        match backend {
            Backend::Reference => Ok(Self::Reference(m)),
            Backend::Simd => Ok(Self::Simd(SimdMatrix::from(m))),
            #[cfg(feature = "wgpu")]
            Backend::Gpu => GpuMatrix::from_reference(m).map(Self::Gpu),
            #[cfg(not(feature = "wgpu"))]
            Backend::Gpu => gpu_disabled("from_reference"),
        }
    }

    /// Zero-filled `rows x cols` matrix on `backend`.
    pub fn zeros(rows: usize, cols: usize, backend: Backend) -> Result<Self> {
        Self::from_reference(Matrix::zeros(rows, cols), backend)
    }

    /// Wraps a row-major buffer on `backend`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>, backend: Backend) -> Result<Self> {
        Self::from_reference(Matrix::from_vec(rows, cols, data)?, backend)
    }

    /// [`Self::zeros`] on the process-wide default backend.
    pub fn zeros_default(rows: usize, cols: usize) -> Result<Self> {
        Self::zeros(rows, cols, default_backend())
    }

    /// [`Self::from_vec`] on the process-wide default backend.
    pub fn from_vec_default(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        Self::from_vec(rows, cols, data, default_backend())
    }

    /// [`Self::zeros`] on the backend recommended for `rows * cols` elements.
    pub fn zeros_for_size(rows: usize, cols: usize) -> Result<Self> {
        Self::zeros(rows, cols, recommended_backend_for_size(rows * cols))
    }

    /// [`Self::from_vec`] on the backend recommended for its element count.
    pub fn from_vec_for_size(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        Self::from_vec(rows, cols, data, recommended_backend_for_size(rows * cols))
    }

    /// Copies the data into a reference matrix.
    pub fn to_reference(&self) -> Result<Matrix> {
        let Shape { rows, cols } = self.shape();
        Matrix::from_vec(rows, cols, self.to_vec()?)
    }

    /// Copies the value onto `backend`.
    pub fn to_backend(&self, backend: Backend) -> Result<Self> {
        Self::from_reference(self.to_reference()?, backend)
    }
}

impl DynColumnVector {
    /// Moves a reference vector onto `backend`.
    pub fn from_reference(v: ColumnVector, backend: Backend) -> Result<Self> {
        match backend {
            Backend::Reference => Ok(Self::Reference(v)),
            Backend::Simd => Ok(Self::Simd(SimdColumnVector::from(v))),
            #[cfg(feature = "wgpu")]
            Backend::Gpu => GpuColumnVector::from_vec(v.into_vec()).map(Self::Gpu),
            #[cfg(not(feature = "wgpu"))]
            Backend::Gpu => gpu_disabled("from_reference"),
        }
    }

    /// Zero-filled vector on `backend`.
    pub fn zeros(len: usize, backend: Backend) -> Result<Self> {
        Self::from_reference(ColumnVector::zeros(len), backend)
    }

    /// Wraps a buffer on `backend`.
    pub fn from_vec(data: Vec<f32>, backend: Backend) -> Result<Self> {
        Self::from_reference(ColumnVector::from_vec(data), backend)
    }

    /// [`Self::zeros`] on the process-wide default backend.
    pub fn zeros_default(len: usize) -> Result<Self> {
        Self::zeros(len, default_backend())
    }

    /// [`Self::from_vec`] on the process-wide default backend.
    pub fn from_vec_default(data: Vec<f32>) -> Result<Self> {
        Self::from_vec(data, default_backend())
    }

    /// [`Self::zeros`] on the backend recommended for `len` elements.
    pub fn zeros_for_size(len: usize) -> Result<Self> {
        Self::zeros(len, recommended_backend_for_size(len))
    }

    /// Copies the data into a reference vector.
    pub fn to_reference(&self) -> Result<ColumnVector> {
        self.to_vec().map(ColumnVector::from_vec)
    }

    /// Copies the value onto `backend`.
    pub fn to_backend(&self, backend: Backend) -> Result<Self> {
        Self::from_reference(self.to_reference()?, backend)
    }
}

/// Zero-filled row vector. Only the reference backend has row vectors.
pub fn row_vector(len: usize, backend: Backend) -> Result<RowVector> {
    row_vector_from_vec(vec![0.0; len], backend)
}

/// Wraps a buffer as a row vector. Only the reference backend has row vectors.
pub fn row_vector_from_vec(data: Vec<f32>, backend: Backend) -> Result<RowVector> {
    match backend {
        Backend::Reference => Ok(RowVector::from_vec(data)),
        backend => Err(MatrixError::Unsupported {
            op: "row_vector",
            backend,
        }),
    }
}

impl From<Matrix> for DynMatrix {
    fn from(m: Matrix) -> Self {
        Self::Reference(m)
    }
}

impl From<SimdMatrix> for DynMatrix {
    fn from(m: SimdMatrix) -> Self {
        Self::Simd(m)
    }
}

#[cfg(feature = "wgpu")]
impl From<GpuMatrix> for DynMatrix {
    fn from(m: GpuMatrix) -> Self {
        Self::Gpu(m)
    }
}

impl From<ColumnVector> for DynColumnVector {
    fn from(v: ColumnVector) -> Self {
        Self::Reference(v)
    }
}

impl From<SimdColumnVector> for DynColumnVector {
    fn from(v: SimdColumnVector) -> Self {
        Self::Simd(v)
    }
}

#[cfg(feature = "wgpu")]
impl From<GpuColumnVector> for DynColumnVector {
    fn from(v: GpuColumnVector) -> Self {
        Self::Gpu(v)
    }
}

impl MatrixOps for DynMatrix {
    type Vector = DynColumnVector;

    fn backend(&self) -> Backend {
        each!(self, m => m.backend())
    }

    fn shape(&self) -> Shape {
        each!(self, m => m.shape())
    }

    fn get(&self, row: usize, col: usize) -> Result<f32> {
        each!(self, m => m.get(row, col))
    }

    fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        each!(self, m => m.set(row, col, value))
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        each!(self, m => m.to_vec())
    }

    fn add(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, add)
    }

    fn add_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, add_scalar(scalar))
    }

    fn subtract(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, subtract)
    }

    fn subtract_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, subtract_scalar(scalar))
    }

    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, subtract_from_scalar(scalar))
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, multiply)
    }

    fn multiply_vector(&self, vector: &DynColumnVector) -> Result<DynColumnVector> {
        match (self, vector) {
            (Self::Reference(m), DynColumnVector::Reference(v)) => {
                m.multiply_vector(v).map(DynColumnVector::Reference)
            }
            (Self::Simd(m), DynColumnVector::Simd(v)) => {
                m.multiply_vector(v).map(DynColumnVector::Simd)
            }
            #[cfg(feature = "wgpu")]
            (Self::Gpu(m), DynColumnVector::Gpu(v)) => {
                m.multiply_vector(v).map(DynColumnVector::Gpu)
            }
            (m, v) => Err(MatrixError::BackendMismatch {
                left: m.backend(),
                right: v.backend(),
            }),
        }
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        unary!(self, scale(scalar))
    }

    fn hadamard_product(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, hadamard_product)
    }

    fn transpose(&self) -> Result<Self> {
        unary!(self, transpose())
    }

    fn sum(&self) -> Result<f32> {
        each!(self, m => m.sum())
    }

    fn log(&self) -> Result<Self> {
        unary!(self, log())
    }

    fn convolution(&self, kernel: &Self) -> Result<Self> {
        binary!(self, kernel, convolution)
    }

    fn convolution_full(&self, kernel: &Self) -> Result<Self> {
        binary!(self, kernel, convolution_full)
    }

    fn set_diagonal(&mut self, value: f32) -> Result<()> {
        each!(self, m => m.set_diagonal(value))
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        each!(self, m => m.set_random(seed, min, max))
    }

    fn unroll(&self) -> Result<DynColumnVector> {
        match self {
            Self::Reference(m) => m.unroll().map(DynColumnVector::Reference),
            Self::Simd(m) => m.unroll().map(DynColumnVector::Simd),
            #[cfg(feature = "wgpu")]
            Self::Gpu(m) => m.unroll().map(DynColumnVector::Gpu),
        }
    }
}

impl VectorOps for DynColumnVector {
    type Matrix = DynMatrix;

    fn backend(&self) -> Backend {
        each!(self, v => v.backend())
    }

    fn len(&self) -> usize {
        each!(self, v => v.len())
    }

    fn get(&self, index: usize) -> Result<f32> {
        each!(self, v => v.get(index))
    }

    fn set(&mut self, index: usize, value: f32) -> Result<()> {
        each!(self, v => v.set(index, value))
    }

    fn to_vec(&self) -> Result<Vec<f32>> {
        each!(self, v => v.to_vec())
    }

    fn add(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, add)
    }

    fn add_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, add_scalar(scalar))
    }

    fn subtract(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, subtract)
    }

    fn subtract_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, subtract_scalar(scalar))
    }

    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self> {
        unary!(self, subtract_from_scalar(scalar))
    }

    fn multiply(&self, rhs: &Self) -> Result<Self> {
        binary!(self, rhs, multiply)
    }

    fn scale(&self, scalar: f32) -> Result<Self> {
        unary!(self, scale(scalar))
    }

    fn outer_product(&self, rhs: &Self) -> Result<DynMatrix> {
        match (self, rhs) {
            (Self::Reference(a), Self::Reference(b)) => {
                a.outer_product(b).map(DynMatrix::Reference)
            }
            (Self::Simd(a), Self::Simd(b)) => a.outer_product(b).map(DynMatrix::Simd),
            #[cfg(feature = "wgpu")]
            (Self::Gpu(a), Self::Gpu(b)) => a.outer_product(b).map(DynMatrix::Gpu),
            (a, b) => Err(MatrixError::BackendMismatch {
                left: a.backend(),
                right: b.backend(),
            }),
        }
    }

    fn sum(&self) -> Result<f32> {
        each!(self, v => v.sum())
    }

    fn max(&self) -> Result<f32> {
        each!(self, v => v.max())
    }

    fn log(&self) -> Result<Self> {
        unary!(self, log())
    }

    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()> {
        each!(self, v => v.set_random(seed, min, max))
    }

    fn concat(parts: &[Self]) -> Result<Self> {
        let Some(first) = parts.first() else {
            return Err(MatrixError::Empty { op: "concat" });
        };
        let backend = first.backend();
        let mut data = Vec::with_capacity(parts.iter().map(Self::len).sum());
        for part in parts {
            if part.backend() != backend {
                return Err(MatrixError::BackendMismatch {
                    left: backend,
                    right: part.backend(),
                });
            }
            data.extend(part.to_vec()?);
        }
        match first {
            Self::Reference(_) => Ok(Self::Reference(ColumnVector::from_vec(data))),
            Self::Simd(_) => Ok(Self::Simd(SimdColumnVector::from_vec(data))),
            #[cfg(feature = "wgpu")]
            Self::Gpu(v) => Ok(Self::Gpu(GpuColumnVector::from_vec_in(
                v.context().clone(),
                data,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::set_default_backend;

    #[test]
    fn mixed_backends_are_rejected() {
        let a = DynMatrix::zeros(2, 2, Backend::Reference).unwrap();
        let b = DynMatrix::zeros(2, 2, Backend::Simd).unwrap();
        let err = a.add(&b).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::BackendMismatch {
                left: Backend::Reference,
                right: Backend::Simd,
            }
        ));

        let v = DynColumnVector::zeros(2, Backend::Simd).unwrap();
        assert!(matches!(
            a.multiply_vector(&v),
            Err(MatrixError::BackendMismatch { .. })
        ));
    }

    #[test]
    fn conversion_keeps_values() {
        let a = DynMatrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Backend::Reference)
            .unwrap();
        let b = a.to_backend(Backend::Simd).unwrap();
        assert_eq!(b.backend(), Backend::Simd);
        assert_eq!(b.shape(), Shape::new(2, 3));
        assert_eq!(b.to_reference().unwrap(), a.to_reference().unwrap());
    }

    #[test]
    fn dispatch_reaches_backend() {
        let a = DynMatrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0], Backend::Simd).unwrap();
        let b = DynMatrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0], Backend::Simd).unwrap();
        let c = a.multiply(&b).unwrap();
        assert_eq!(c.backend(), Backend::Simd);
        assert_eq!(c.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
        let v = c.unroll().unwrap();
        assert_eq!(v.backend(), Backend::Simd);
        assert_eq!(v.max().unwrap(), 50.0);
    }

    #[test]
    fn row_vectors_are_reference_only() {
        assert_eq!(row_vector(3, Backend::Reference).unwrap().len(), 3);
        for backend in [Backend::Simd, Backend::Gpu] {
            assert!(matches!(
                row_vector(3, backend),
                Err(MatrixError::Unsupported { op: "row_vector", .. })
            ));
        }
    }

    #[cfg(not(feature = "wgpu"))]
    #[test]
    fn gpu_is_unsupported_without_feature() {
        assert!(matches!(
            DynMatrix::zeros(1, 1, Backend::Gpu),
            Err(MatrixError::Unsupported {
                backend: Backend::Gpu,
                ..
            })
        ));
    }

    #[test]
    fn default_and_sized_factories() {
        set_default_backend(Backend::Reference);
        assert_eq!(DynMatrix::zeros_default(2, 2).unwrap().backend(), Backend::Reference);
        assert_eq!(
            DynColumnVector::zeros_for_size(4).unwrap().backend(),
            Backend::Reference
        );
        set_default_backend(Backend::Simd);
    }

    #[test]
    fn concat_requires_one_backend() {
        let a = DynColumnVector::from_vec(vec![1.0], Backend::Simd).unwrap();
        let b = DynColumnVector::from_vec(vec![2.0], Backend::Simd).unwrap();
        let c = DynColumnVector::from_vec(vec![3.0], Backend::Reference).unwrap();
        let joined = DynColumnVector::concat(&[a, b]).unwrap();
        assert_eq!(joined.to_vec().unwrap(), vec![1.0, 2.0]);
        assert!(matches!(
            DynColumnVector::concat(&[joined, c]),
            Err(MatrixError::BackendMismatch { .. })
        ));
        assert!(matches!(
            DynColumnVector::concat(&[]),
            Err(MatrixError::Empty { op: "concat" })
        ));
    }
}
