//! Chunked SIMD kernels.
//!
//! Each kernel splits its inputs into `len / 16` full registers and a
//! `len % 16` remainder. Full chunks go through a [`Register`]; the remainder
//! goes through the matching scalar kernel from the reference backend.
//!
//! The public entry points pick the AVX register when it was detected at
//! runtime and fall back to the portable register otherwise.

use rayon::prelude::*;

use super::lanes::{LANES, Portable16, Register};
use crate::reference::kernels as scalar;

mod generic {
    use super::*;

    #[inline(always)]
    fn zip<R: Register>(
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        op: impl Fn(R, R) -> R,
        tail: fn(&[f32], &[f32], &mut [f32]),
    ) {
        let (a_chunks, a_tail) = a.as_chunks::<LANES>();
        let (b_chunks, b_tail) = b.as_chunks::<LANES>();
        let (o_chunks, o_tail) = out.as_chunks_mut::<LANES>();
        for ((x, y), o) in a_chunks.iter().zip(b_chunks).zip(o_chunks) {
            op(R::load(x), R::load(y)).store(o);
        }
        tail(a_tail, b_tail, o_tail);
    }

    #[inline(always)]
    fn map<R: Register>(
        a: &[f32],
        s: f32,
        out: &mut [f32],
        op: impl Fn(R, R) -> R,
        tail: impl Fn(&[f32], f32, &mut [f32]),
    ) {
        let splat = R::splat(s);
        let (a_chunks, a_tail) = a.as_chunks::<LANES>();
        let (o_chunks, o_tail) = out.as_chunks_mut::<LANES>();
        for (x, o) in a_chunks.iter().zip(o_chunks) {
            op(R::load(x), splat).store(o);
        }
        tail(a_tail, s, o_tail);
    }

    #[inline(always)]
    pub fn add<R: Register>(a: &[f32], b: &[f32], out: &mut [f32]) {
        zip::<R>(a, b, out, R::add, scalar::add);
    }

    #[inline(always)]
    pub fn sub<R: Register>(a: &[f32], b: &[f32], out: &mut [f32]) {
        zip::<R>(a, b, out, R::sub, scalar::sub);
    }

    #[inline(always)]
    pub fn mul<R: Register>(a: &[f32], b: &[f32], out: &mut [f32]) {
        zip::<R>(a, b, out, R::mul, scalar::mul);
    }

    #[inline(always)]
    pub fn add_scalar<R: Register>(a: &[f32], s: f32, out: &mut [f32]) {
        map::<R>(a, s, out, R::add, scalar::add_scalar);
    }

    #[inline(always)]
    pub fn scalar_sub<R: Register>(a: &[f32], s: f32, out: &mut [f32]) {
        map::<R>(a, s, out, |x, s| s.sub(x), |a, s, o| scalar::scalar_sub(s, a, o));
    }

    #[inline(always)]
    pub fn scale<R: Register>(a: &[f32], s: f32, out: &mut [f32]) {
        map::<R>(a, s, out, R::mul, scalar::scale);
    }

    #[inline(always)]
    pub fn sum<R: Register>(a: &[f32]) -> f32 {
        let (chunks, tail) = a.as_chunks::<LANES>();
        let mut acc = R::zero();
        for x in chunks {
            acc = acc.add(R::load(x));
        }
        acc.reduce_sum() + scalar::sum(tail)
    }

    #[inline(always)]
    pub fn max<R: Register>(a: &[f32]) -> f32 {
        let (chunks, tail) = a.as_chunks::<LANES>();
        let Some((first, rest)) = chunks.split_first() else {
            return scalar::max(tail);
        };
        let mut acc = R::load(first);
        for x in rest {
            acc = acc.max(R::load(x));
        }
        acc.reduce_max().max(scalar::max(tail))
    }

    #[inline(always)]
    pub fn dot<R: Register>(a: &[f32], b: &[f32]) -> f32 {
        let (a_chunks, a_tail) = a.as_chunks::<LANES>();
        let (b_chunks, b_tail) = b.as_chunks::<LANES>();
        let mut acc = R::zero();
        for (x, y) in a_chunks.iter().zip(b_chunks) {
            acc = acc.add(R::load(x).mul(R::load(y)));
        }
        acc.reduce_sum() + scalar::dot(a_tail, b_tail)
    }

    /// One output row per left element; chunking restarts on every row.
    #[inline(always)]
    pub fn outer<R: Register>(a: &[f32], b: &[f32], out: &mut [f32]) {
        if b.is_empty() {
            return;
        }
        for (&x, row) in a.iter().zip(out.chunks_exact_mut(b.len())) {
            scale::<R>(b, x, row);
        }
    }

    /// `a` is `m x k`, `bt` is the right operand already transposed (`n x k`).
    #[inline(always)]
    pub fn matmul_transposed<R: Register>(a: &[f32], bt: &[f32], k: usize, out: &mut [f32]) {
        let n = if k == 0 { 0 } else { bt.len() / k };
        if n == 0 || k == 0 {
            out.fill(0.0);
            return;
        }
        out.par_chunks_mut(n)
            .zip(a.par_chunks(k))
            .for_each(|(row, lhs)| {
                for (o, rhs) in row.iter_mut().zip(bt.chunks_exact(k)) {
                    *o = dot::<R>(lhs, rhs);
                }
            });
    }

    #[inline(always)]
    pub fn matvec<R: Register>(a: &[f32], x: &[f32], out: &mut [f32]) {
        let n = x.len();
        if n == 0 {
            out.fill(0.0);
            return;
        }
        for (o, row) in out.iter_mut().zip(a.chunks_exact(n)) {
            *o = dot::<R>(row, x);
        }
    }
}

macro_rules! simd_entry {
    ($(#[$doc:meta])* $name:ident ( $( $arg:ident : $ty:ty ),* ) $( -> $ret:ty )?) => {
        $(#[$doc])*
        pub fn $name($( $arg: $ty ),*) $( -> $ret )? {
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            {
                #[target_feature(enable = "avx")]
                unsafe fn avx($( $arg: $ty ),*) $( -> $ret )? {
                    generic::$name::<super::lanes::Avx16>($( $arg ),*)
                }
                if super::has_avx() {
                    // SAFETY: AVX support was detected at runtime.
                    return unsafe { avx($( $arg ),*) };
                }
            }
            generic::$name::<Portable16>($( $arg ),*)
        }
    };
}

simd_entry!(
    /// `out = a + b`
    add(a: &[f32], b: &[f32], out: &mut [f32])
);
simd_entry!(
    /// `out = a - b`
    sub(a: &[f32], b: &[f32], out: &mut [f32])
);
simd_entry!(
    /// `out = a * b` elementwise
    mul(a: &[f32], b: &[f32], out: &mut [f32])
);
simd_entry!(
    /// `out = a + s`
    add_scalar(a: &[f32], s: f32, out: &mut [f32])
);
simd_entry!(
    /// `out = s - a`
    scalar_sub(a: &[f32], s: f32, out: &mut [f32])
);
simd_entry!(
    /// `out = a * s`
    scale(a: &[f32], s: f32, out: &mut [f32])
);
simd_entry!(
    /// Total of all elements.
    sum(a: &[f32]) -> f32
);
simd_entry!(
    /// Largest element, `NEG_INFINITY` when empty.
    max(a: &[f32]) -> f32
);
simd_entry!(
    /// `out[i * b.len() + j] = a[i] * b[j]`
    outer(a: &[f32], b: &[f32], out: &mut [f32])
);
simd_entry!(
    /// Matrix product against a pre-transposed right operand.
    matmul_transposed(a: &[f32], bt: &[f32], k: usize, out: &mut [f32])
);
simd_entry!(
    /// `out = a * x` for a row-major `out.len() x x.len()` matrix.
    matvec(a: &[f32], x: &[f32], out: &mut [f32])
);

#[cfg(test)]
mod tests {
    use super::*;

    const SIZES: [usize; 8] = [1, 15, 16, 17, 31, 32, 57, 1024];

    fn data(n: usize, offset: f32) -> Vec<f32> {
        (0..n).map(|i| (i as f32 * 0.37 + offset).sin()).collect()
    }

    #[test]
    fn elementwise_matches_scalar_for_remainder_sizes() {
        for n in SIZES {
            let (a, b) = (data(n, 0.1), data(n, 2.0));
            let mut want = vec![0.0; n];
            let mut got = vec![0.0; n];

            scalar::add(&a, &b, &mut want);
            add(&a, &b, &mut got);
            assert_eq!(want, got, "add n={n}");

            scalar::sub(&a, &b, &mut want);
            sub(&a, &b, &mut got);
            assert_eq!(want, got, "sub n={n}");

            scalar::mul(&a, &b, &mut want);
            mul(&a, &b, &mut got);
            assert_eq!(want, got, "mul n={n}");

            scalar::scalar_sub(3.0, &a, &mut want);
            scalar_sub(&a, 3.0, &mut got);
            assert_eq!(want, got, "scalar_sub n={n}");
        }
    }

    #[test]
    fn reductions_match_scalar_within_rounding() {
        for n in SIZES {
            let (a, b) = (data(n, 0.5), data(n, 1.5));
            assert!((sum(&a) - scalar::sum(&a)).abs() < 1e-3, "sum n={n}");
            let dot = generic::dot::<Portable16>(&a, &b);
            assert!((dot - scalar::dot(&a, &b)).abs() < 1e-3, "dot n={n}");
            assert_eq!(max(&a), scalar::max(&a), "max n={n}");
        }
        assert_eq!(sum(&[]), 0.0);
        assert_eq!(max(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn max_skips_nan_like_scalar() {
        let mut a = vec![0.0; 40];
        a[0] = 100.0;
        a[16] = f32::NAN;
        a[33] = f32::NAN;
        assert_eq!(max(&a), 100.0);
        assert_eq!(max(&a), scalar::max(&a));

        a[0] = f32::NAN;
        a[20] = 7.0;
        assert_eq!(max(&a), 7.0);
        assert_eq!(max(&[f32::NAN; 32]), scalar::max(&[f32::NAN; 32]));
    }

    #[test]
    fn outer_product_rows() {
        let mut out = vec![0.0; 6];
        outer(&[1.0, 2.0, 3.0], &[4.0, 5.0], &mut out);
        assert_eq!(out, vec![4.0, 5.0, 8.0, 10.0, 12.0, 15.0]);
    }

    #[test]
    fn matmul_against_transposed_rhs() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        let bt = scalar::transpose(&b, 2, 2);
        let mut out = vec![0.0; 4];
        matmul_transposed(&a, &bt, 2, &mut out);
        assert_eq!(out, vec![19.0, 22.0, 43.0, 50.0]);
    }
}
