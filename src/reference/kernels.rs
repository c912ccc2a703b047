//! Scalar slice kernels.
//!
//! These are the ground truth for every backend. The SIMD backend runs them
//! on the remainder tail of each operation and the GPU backend runs them for
//! operations that have no device kernel, so all three agree by construction
//! on the parts they share.
//!
//! Callers validate lengths; the kernels only `debug_assert!` them.

use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::MatrixError;

/// `out[i] = a[i] + b[i]`
pub fn add(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && a.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x + y;
    }
}

/// `out[i] = a[i] - b[i]`
pub fn sub(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && a.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x - y;
    }
}

/// `out[i] = a[i] * b[i]`
pub fn mul(a: &[f32], b: &[f32], out: &mut [f32]) {
    debug_assert!(a.len() == b.len() && a.len() == out.len());
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = x * y;
    }
}

/// `out[i] = a[i] + s`
pub fn add_scalar(a: &[f32], s: f32, out: &mut [f32]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = x + s;
    }
}

/// `out[i] = s - a[i]`
pub fn scalar_sub(s: f32, a: &[f32], out: &mut [f32]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = s - x;
    }
}

/// `out[i] = a[i] * s`
pub fn scale(a: &[f32], s: f32, out: &mut [f32]) {
    debug_assert_eq!(a.len(), out.len());
    for (o, &x) in out.iter_mut().zip(a) {
        *o = x * s;
    }
}

/// Sequential total.
pub fn sum(a: &[f32]) -> f32 {
    let mut acc = 0.0;
    for &x in a {
        acc += x;
    }
    acc
}

/// Largest element, `NEG_INFINITY` for an empty slice.
pub fn max(a: &[f32]) -> f32 {
    a.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// `sum(a[i] * b[i])`
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        acc += x * y;
    }
    acc
}

/// Elementwise natural logarithm.
pub fn ln(a: &[f32]) -> Vec<f32> {
    a.iter().map(|x| x.ln()).collect()
}

/// `(m x k) * (k x n)`, row of `a` against column of `b`.
pub fn matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    debug_assert!(a.len() == m * k && b.len() == k * n);
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0;
            for l in 0..k {
                acc += a[i * k + l] * b[l * n + j];
            }
            out[i * n + j] = acc;
        }
    }
    out
}

/// `(m x n) * (n x 1)`
pub fn matvec(a: &[f32], x: &[f32], m: usize, n: usize) -> Vec<f32> {
    debug_assert!(a.len() == m * n && x.len() == n);
    (0..m).map(|i| dot(&a[i * n..(i + 1) * n], x)).collect()
}

/// `out[i * b.len() + j] = a[i] * b[j]`
pub fn outer(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for &x in a {
        out.extend(b.iter().map(|&y| x * y));
    }
    out
}

/// Row-major transpose of a `rows x cols` buffer.
pub fn transpose(a: &[f32], rows: usize, cols: usize) -> Vec<f32> {
    debug_assert_eq!(a.len(), rows * cols);
    let mut out = vec![0.0; a.len()];
    for r in 0..rows {
        for c in 0..cols {
            out[c * rows + r] = a[r * cols + c];
        }
    }
    out
}

/// Valid-mode correlation of a `kr x kc` kernel over an `ir x ic` input.
///
/// Requires `1 <= kr <= ir` and `1 <= kc <= ic`.
pub fn convolve_valid(
    input: &[f32],
    (ir, ic): (usize, usize),
    kernel: &[f32],
    (kr, kc): (usize, usize),
) -> Vec<f32> {
    let (or, oc) = (ir - kr + 1, ic - kc + 1);
    let mut out = vec![0.0; or * oc];
    for t in 0..or {
        for l in 0..oc {
            let mut acc = 0.0;
            for r in 0..kr {
                let src = &input[(t + r) * ic + l..(t + r) * ic + l + kc];
                acc += dot(&kernel[r * kc..(r + 1) * kc], src);
            }
            out[t * oc + l] = acc;
        }
    }
    out
}

/// Full-mode convolution: the input is zero-padded by `k - 1` on each side
/// and the flipped kernel slides over it.
///
/// Requires a non-empty kernel.
pub fn convolve_full(
    input: &[f32],
    (ir, ic): (usize, usize),
    kernel: &[f32],
    (kr, kc): (usize, usize),
) -> Vec<f32> {
    let (or, oc) = (ir + kr - 1, ic + kc - 1);
    let mut out = vec![0.0; or * oc];
    for y in 0..or {
        for x in 0..oc {
            let mut acc = 0.0;
            for r in 0..kr {
                // padded row y + r maps to input row y + r - (kr - 1)
                let Some(src_r) = (y + r).checked_sub(kr - 1).filter(|&v| v < ir) else {
                    continue;
                };
                for c in 0..kc {
                    let Some(src_c) = (x + c).checked_sub(kc - 1).filter(|&v| v < ic) else {
                        continue;
                    };
                    acc += input[src_r * ic + src_c] * kernel[(kr - 1 - r) * kc + (kc - 1 - c)];
                }
            }
            out[y * oc + x] = acc;
        }
    }
    out
}

/// Refills `out` row-major with values drawn uniformly from `[min, max)`.
///
/// `min == max` fills with `min`. Reversed or non-finite bounds are rejected.
pub fn fill_random(out: &mut [f32], seed: u64, min: f32, max: f32) -> Result<(), MatrixError> {
    if min == max && min.is_finite() {
        out.fill(min);
        return Ok(());
    }
    let uniform = Uniform::new(min, max).map_err(|_| MatrixError::InvalidRange { min, max })?;
    let rng = StdRng::seed_from_u64(seed);
    for (o, v) in out.iter_mut().zip(rng.sample_iter(uniform)) {
        *o = v;
    }
    Ok(())
}
