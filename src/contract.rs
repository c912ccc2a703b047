//! The arithmetic contract every backend implements.
//!
//! [`MatrixOps`] and [`VectorOps`] are the polymorphic interface shared by the
//! reference, SIMD and GPU value types. Callers pick a backend by constructing
//! values of that backend's type; the traits never coerce between backends.
//! Explicit conversions live on the concrete types (`From` impls,
//! `into_reference`, `to_reference`) and on
//! [`crate::factory::DynMatrix::to_backend`].
//!
//! Every operation is non-mutating except the `set*` family, validates
//! operand shapes before computing, and returns a fresh value.

use crate::backend::Backend;
use crate::error::Result;
use crate::shape::Shape;

/// Operations on a dense `rows x cols` matrix of `f32`.
pub trait MatrixOps: Sized + Send + Sync {
    /// Column vector type of the same backend.
    type Vector: VectorOps<Matrix = Self>;

    /// Backend this value computes on.
    fn backend(&self) -> Backend;

    /// Shape of the matrix.
    fn shape(&self) -> Shape;

    /// Number of rows.
    fn rows(&self) -> usize {
        self.shape().rows
    }

    /// Number of columns.
    fn cols(&self) -> usize {
        self.shape().cols
    }

    /// Reads the element at `(row, col)`.
    fn get(&self, row: usize, col: usize) -> Result<f32>;

    /// Writes the element at `(row, col)`.
    fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()>;

    /// Row-major copy of every element.
    fn to_vec(&self) -> Result<Vec<f32>>;

    /// Elementwise `self + rhs`.
    fn add(&self, rhs: &Self) -> Result<Self>;

    /// `self + scalar` for every element.
    fn add_scalar(&self, scalar: f32) -> Result<Self>;

    /// Elementwise `self - rhs`.
    fn subtract(&self, rhs: &Self) -> Result<Self>;

    /// `self - scalar` for every element.
    fn subtract_scalar(&self, scalar: f32) -> Result<Self>;

    /// `scalar - self` for every element.
    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self>;

    /// Matrix product `self * rhs`.
    fn multiply(&self, rhs: &Self) -> Result<Self>;

    /// Matrix-vector product `self * vector`.
    fn multiply_vector(&self, vector: &Self::Vector) -> Result<Self::Vector>;

    /// `self * scalar` for every element.
    fn scale(&self, scalar: f32) -> Result<Self>;

    /// Elementwise product.
    fn hadamard_product(&self, rhs: &Self) -> Result<Self>;

    /// Swaps rows and columns.
    fn transpose(&self) -> Result<Self>;

    /// Total of all elements.
    fn sum(&self) -> Result<f32>;

    /// Elementwise natural logarithm.
    fn log(&self) -> Result<Self>;

    /// Valid-mode 2-D convolution: output is `input - kernel + 1` per axis.
    fn convolution(&self, kernel: &Self) -> Result<Self>;

    /// Full-mode 2-D convolution with the kernel flipped: output is
    /// `input + kernel - 1` per axis.
    fn convolution_full(&self, kernel: &Self) -> Result<Self>;

    /// Sets every element of the main diagonal. The matrix must be square.
    fn set_diagonal(&mut self, value: f32) -> Result<()>;

    /// Refills the matrix from a seeded uniform generator over `[min, max)`.
    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()>;

    /// Flattens row-major into a column vector.
    fn unroll(&self) -> Result<Self::Vector>;
}

/// Operations on a dense column vector of `f32`.
pub trait VectorOps: Sized + Send + Sync {
    /// Matrix type of the same backend.
    type Matrix;

    /// Backend this value computes on.
    fn backend(&self) -> Backend;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether the vector holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads element `index`.
    fn get(&self, index: usize) -> Result<f32>;

    /// Writes element `index`.
    fn set(&mut self, index: usize, value: f32) -> Result<()>;

    /// Copy of every element.
    fn to_vec(&self) -> Result<Vec<f32>>;

    /// Elementwise `self + rhs`.
    fn add(&self, rhs: &Self) -> Result<Self>;

    /// `self + scalar` for every element.
    fn add_scalar(&self, scalar: f32) -> Result<Self>;

    /// Elementwise `self - rhs`.
    fn subtract(&self, rhs: &Self) -> Result<Self>;

    /// `self - scalar` for every element.
    fn subtract_scalar(&self, scalar: f32) -> Result<Self>;

    /// `scalar - self` for every element.
    fn subtract_from_scalar(&self, scalar: f32) -> Result<Self>;

    /// Elementwise product.
    fn multiply(&self, rhs: &Self) -> Result<Self>;

    /// `self * scalar` for every element.
    fn scale(&self, scalar: f32) -> Result<Self>;

    /// `result[i, j] = self[i] * rhs[j]`.
    fn outer_product(&self, rhs: &Self) -> Result<Self::Matrix>;

    /// Total of all elements.
    fn sum(&self) -> Result<f32>;

    /// Largest element.
    fn max(&self) -> Result<f32>;

    /// Elementwise natural logarithm.
    fn log(&self) -> Result<Self>;

    /// Refills the vector from a seeded uniform generator over `[min, max)`.
    fn set_random(&mut self, seed: u64, min: f32, max: f32) -> Result<()>;

    /// Concatenates `parts` in order into one vector.
    fn concat(parts: &[Self]) -> Result<Self>;
}
