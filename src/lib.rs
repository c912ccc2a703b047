//! briny_linalg: dense `f32` matrices and vectors with interchangeable
//! compute backends.
//!
//! Every backend implements the same arithmetic contract, so code written
//! against [`contract::MatrixOps`] and [`contract::VectorOps`] runs unchanged
//! on any of them.
//!
//! # Backends
//!
//! - [`reference`]: scalar nested loops. The correctness oracle.
//! - [`simd`]: 16-lane register kernels with scalar remainder handling.
//! - `gpu`: `wgpu` compute kernels over device-resident buffers (feature
//!   `wgpu`).
//!
//! # Modules
//!
//! - [`contract`]: the traits every backend implements.
//! - [`selector`]: capability probing and backend recommendation.
//! - [`factory`]: runtime-polymorphic values and backend-aware constructors.
//! - [`tensor`]: matrix / vector / matrix-list union for layer stacks.
//! - [`approx`]: tolerances for comparing results across backends.
//! - [`error`]: the error taxonomy.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events and never prints. Install a subscriber
//! to see context creation, capability probes and GPU host fallbacks.
//!
//! # Example
//!
//! ```rust
//! use briny_linalg::contract::{MatrixOps, VectorOps};
//! use briny_linalg::matrix;
//! use briny_linalg::simd::{SimdColumnVector, SimdMatrix};
//!
//! let a = SimdMatrix::from(matrix!([[1, 2], [3, 4]]));
//! let b = SimdMatrix::from(matrix!([[5, 6], [7, 8]]));
//! assert_eq!(a.multiply(&b).unwrap().as_slice(), &[19.0, 22.0, 43.0, 50.0]);
//!
//! let x = SimdColumnVector::from_vec(vec![1.0, 2.0, 3.0]);
//! let y = SimdColumnVector::from_vec(vec![4.0, 5.0]);
//! assert_eq!(x.outer_product(&y).unwrap().shape().to_string(), "3x2");
//! ```

pub mod approx;
pub mod backend;
pub mod contract;
pub mod error;
pub mod factory;
#[cfg(feature = "wgpu")]
pub mod gpu;
pub mod reference;
pub mod selector;
pub mod shape;
pub mod simd;
pub mod tensor;

pub use backend::Backend;
pub use contract::{MatrixOps, VectorOps};
pub use error::{DeviceError, MatrixError, Result};
pub use shape::Shape;
pub use tensor::Tensor;
