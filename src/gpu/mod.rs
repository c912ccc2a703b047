//! # GPU Backend
//!
//! Implements the numeric contract with `wgpu` compute shaders.
//!
//! ## Residency
//!
//! [`GpuMatrix`] and [`GpuColumnVector`] start host-resident. The first device
//! kernel that touches a value uploads it; kernel results are fresh device
//! allocations that stay on the device until an element is read. Dropping a
//! value, or calling `release` on it, frees its device memory.
//!
//! ## Device kernels
//!
//! Matrix product, matrix-vector product, transpose, outer product and the
//! elementwise add, subtract and scalar forms.
//!
//! ## Host fallbacks
//!
//! `log`, both convolutions, `hadamard_product`, `set_diagonal`, `sum`,
//! `max` and elementwise vector multiply download their operands and compute
//! on the reference backend, producing identical results. Each fallback logs
//! at `debug` level. These are performance gaps, not correctness gaps.
//!
//! ## Contexts
//!
//! Values are bound to the [`GpuContext`] they were created on. Use
//! [`GpuContext::shared`] (created once, race-free) or build one with
//! [`GpuContext::new`] and pass it to the `*_in` constructors. Mixing values
//! from different contexts fails with
//! [`DeviceError::ContextMismatch`](crate::error::DeviceError::ContextMismatch).

mod context;
mod kernels;
mod matrix;
mod memory;
mod resident;
mod vector;

pub use context::GpuContext;
pub use matrix::GpuMatrix;
pub use memory::{DeviceBuffer, MemoryManager};
pub use vector::GpuColumnVector;
