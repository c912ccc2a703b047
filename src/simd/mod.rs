//! # SIMD Backend
//!
//! Implements the numeric contract with 16-lane `f32` registers over the same
//! row-major storage as the reference backend.
//!
//! ## Vectorized
//!
//! - elementwise add, subtract, multiply and every scalar form
//! - sum, max and dot-product reductions
//! - outer product (one broadcast row per left element)
//! - matrix product (row-by-row dot products against the transposed rhs,
//!   parallelized across output rows with `rayon`)
//! - matrix-vector product
//!
//! ## Delegated to the reference backend
//!
//! `log`, `transpose`, both convolutions, `set_diagonal` and `set_random`.
//!
//! ## Availability
//!
//! The kernels always run: without AVX the portable register is used. The
//! backend reports itself *available* (see [`is_available`]) only when a real
//! vector unit backs the register, i.e. AVX on x86_64 (feature `simd`) or
//! NEON on aarch64.

mod kernels;
mod lanes;
mod matrix;
mod vector;

pub use lanes::LANES;
pub use matrix::SimdMatrix;
pub use vector::SimdColumnVector;

lazy_static::lazy_static! {
    static ref AVX: bool = detect_avx();
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
fn detect_avx() -> bool {
    std::is_x86_feature_detected!("avx")
}

#[cfg(not(all(feature = "simd", target_arch = "x86_64")))]
fn detect_avx() -> bool {
    false
}

/// Whether the AVX register path is in use.
pub(crate) fn has_avx() -> bool {
    *AVX
}

/// Whether the host has a vector unit backing the 16-lane register.
#[must_use]
pub fn is_available() -> bool {
    cfg!(target_arch = "aarch64") || has_avx()
}
