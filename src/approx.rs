//! Tolerances and approximate comparison for cross-backend results.
//!
//! Backends accumulate in different orders, so their results agree only up
//! to rounding. Comparisons here use absolute differences.

use crate::contract::{MatrixOps, VectorOps};
use crate::error::Result;

/// Largest absolute difference accepted between backends in general.
pub const TOLERANCE: f32 = 1e-3;

/// Difference accepted for reductions over large inputs, where rounding
/// compounds.
pub const ACCUMULATION_TOLERANCE: f32 = 1.0;

/// Element count from which [`ACCUMULATION_TOLERANCE`] applies.
pub const ACCUMULATION_ELEMENTS: usize = 256 * 256;

/// Difference below which two values count as [`ApproxEquality::Precise`].
pub const PRECISE_ERROR: f32 = 1e-6;

/// Difference below which two values count as [`ApproxEquality::Partial`].
pub const PARTIAL_ERROR: f32 = 1e-5;

/// Tolerance for a result that accumulated `elements` values.
#[must_use]
pub const fn tolerance_for(elements: usize) -> f32 {
    if elements >= ACCUMULATION_ELEMENTS {
        ACCUMULATION_TOLERANCE
    } else {
        TOLERANCE
    }
}

/// How closely two values agree, best first.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApproxEquality {
    /// Within [`PRECISE_ERROR`].
    Precise = 0,
    /// Within [`PARTIAL_ERROR`].
    Partial = 1,
    /// Within [`TOLERANCE`].
    Relative = 2,
    /// Further apart than [`TOLERANCE`], or of different lengths.
    Scarce = 3,
}

/// Grades the distance between two values.
pub trait RelativeEq<Rhs: ?Sized> {
    /// Worst grade over every compared element.
    fn approx_eq(&self, rhs: &Rhs) -> ApproxEquality;
}

impl RelativeEq<Self> for f32 {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        let dif = (self - rhs).abs();
        if dif < PRECISE_ERROR {
            ApproxEquality::Precise
        } else if dif < PARTIAL_ERROR {
            ApproxEquality::Partial
        } else if dif < TOLERANCE {
            ApproxEquality::Relative
        } else {
            ApproxEquality::Scarce
        }
    }
}

impl RelativeEq<Self> for [f32] {
    fn approx_eq(&self, rhs: &Self) -> ApproxEquality {
        if self.len() != rhs.len() {
            return ApproxEquality::Scarce;
        }
        let mut eq = ApproxEquality::Precise;
        for (a, b) in self.iter().zip(rhs) {
            eq = eq.max(a.approx_eq(b));
            if eq == ApproxEquality::Scarce {
                break;
            }
        }
        eq
    }
}

/// Largest absolute elementwise difference. `f32::INFINITY` when the lengths
/// differ.
#[must_use]
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

/// Whether every element of `a` is within `tolerance` of `b`.
#[must_use]
pub fn slices_close(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    max_abs_diff(a, b) <= tolerance
}

/// Whether two matrices, possibly on different backends, have the same shape
/// and elements within `tolerance`.
pub fn matrices_close<A: MatrixOps, B: MatrixOps>(a: &A, b: &B, tolerance: f32) -> Result<bool> {
    Ok(a.shape() == b.shape() && slices_close(&a.to_vec()?, &b.to_vec()?, tolerance))
}

/// Whether two vectors, possibly on different backends, have the same length
/// and elements within `tolerance`.
pub fn vectors_close<A: VectorOps, B: VectorOps>(a: &A, b: &B, tolerance: f32) -> Result<bool> {
    Ok(a.len() == b.len() && slices_close(&a.to_vec()?, &b.to_vec()?, tolerance))
}
