//! 16-lane `f32` registers.
//!
//! [`Register`] abstracts one logical register of [`LANES`] floats. Two
//! implementations exist:
//!
//! - [`Portable16`]: a plain `[f32; 16]`, lowered by LLVM to whatever vector
//!   unit the target has (NEON on aarch64, SSE2 on x86_64).
//! - [`Avx16`]: a pair of `__m256` halves. Only constructed inside functions
//!   compiled with `#[target_feature(enable = "avx")]` after runtime detection.

/// Floats per logical register.
pub const LANES: usize = 16;

/// One logical 16-lane register.
pub(crate) trait Register: Copy {
    fn load(src: &[f32; LANES]) -> Self;
    fn store(self, dst: &mut [f32; LANES]);
    fn splat(value: f32) -> Self;
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn max(self, rhs: Self) -> Self;
    fn reduce_sum(self) -> f32;
    fn reduce_max(self) -> f32;

    #[inline(always)]
    fn zero() -> Self {
        Self::splat(0.0)
    }
}

#[derive(Clone, Copy)]
pub(crate) struct Portable16([f32; LANES]);

impl Portable16 {
    #[inline(always)]
    fn lanewise(self, rhs: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut out = [0.0; LANES];
        for ((o, a), b) in out.iter_mut().zip(self.0).zip(rhs.0) {
            *o = f(a, b);
        }
        Self(out)
    }
}

impl Register for Portable16 {
    #[inline(always)]
    fn load(src: &[f32; LANES]) -> Self {
        Self(*src)
    }

    #[inline(always)]
    fn store(self, dst: &mut [f32; LANES]) {
        *dst = self.0;
    }

    #[inline(always)]
    fn splat(value: f32) -> Self {
        Self([value; LANES])
    }

    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        self.lanewise(rhs, |a, b| a + b)
    }

    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        self.lanewise(rhs, |a, b| a - b)
    }

    #[inline(always)]
    fn mul(self, rhs: Self) -> Self {
        self.lanewise(rhs, |a, b| a * b)
    }

    #[inline(always)]
    fn max(self, rhs: Self) -> Self {
        self.lanewise(rhs, f32::max)
    }

    #[inline(always)]
    fn reduce_sum(self) -> f32 {
        // pairwise, matching the tree shape of the AVX reduction
        let mut v = self.0;
        let mut width = LANES / 2;
        while width > 0 {
            for i in 0..width {
                v[i] += v[i + width];
            }
            width /= 2;
        }
        v[0]
    }

    #[inline(always)]
    fn reduce_max(self) -> f32 {
        self.0.into_iter().fold(f32::NEG_INFINITY, f32::max)
    }
}

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
pub(crate) use avx::Avx16;

#[cfg(all(feature = "simd", target_arch = "x86_64"))]
mod avx {
    use super::{LANES, Register};
    use std::arch::x86_64::*;

    /// Two AVX halves. Every method requires AVX; see the module docs.
    #[derive(Clone, Copy)]
    pub(crate) struct Avx16(__m256, __m256);

    /// Lanewise `f32::max`: a NaN in either operand yields the other one.
    #[inline(always)]
    unsafe fn max_ignoring_nan(a: __m256, b: __m256) -> __m256 {
        unsafe {
            // `_mm256_max_ps` returns `b` whenever either lane is NaN
            let max = _mm256_max_ps(a, b);
            _mm256_blendv_ps(max, a, _mm256_cmp_ps::<_CMP_UNORD_Q>(b, b))
        }
    }

    impl Register for Avx16 {
        #[inline(always)]
        fn load(src: &[f32; LANES]) -> Self {
            // SAFETY: `src` holds 16 floats; loads are unaligned.
            unsafe {
                Self(
                    _mm256_loadu_ps(src.as_ptr()),
                    _mm256_loadu_ps(src.as_ptr().add(8)),
                )
            }
        }

        #[inline(always)]
        fn store(self, dst: &mut [f32; LANES]) {
            // SAFETY: `dst` holds 16 floats; stores are unaligned.
            unsafe {
                _mm256_storeu_ps(dst.as_mut_ptr(), self.0);
                _mm256_storeu_ps(dst.as_mut_ptr().add(8), self.1);
            }
        }

        #[inline(always)]
        fn splat(value: f32) -> Self {
            unsafe {
                let v = _mm256_set1_ps(value);
                Self(v, v)
            }
        }

        #[inline(always)]
        fn add(self, rhs: Self) -> Self {
            unsafe { Self(_mm256_add_ps(self.0, rhs.0), _mm256_add_ps(self.1, rhs.1)) }
        }

        #[inline(always)]
        fn sub(self, rhs: Self) -> Self {
            unsafe { Self(_mm256_sub_ps(self.0, rhs.0), _mm256_sub_ps(self.1, rhs.1)) }
        }

        #[inline(always)]
        fn mul(self, rhs: Self) -> Self {
            unsafe { Self(_mm256_mul_ps(self.0, rhs.0), _mm256_mul_ps(self.1, rhs.1)) }
        }

        #[inline(always)]
        fn max(self, rhs: Self) -> Self {
            unsafe {
                Self(
                    max_ignoring_nan(self.0, rhs.0),
                    max_ignoring_nan(self.1, rhs.1),
                )
            }
        }

        #[inline(always)]
        fn reduce_sum(self) -> f32 {
            unsafe {
                let v = _mm256_add_ps(self.0, self.1);
                let hi = _mm256_extractf128_ps(v, 1);
                let lo = _mm256_castps256_ps128(v);
                let quad = _mm_add_ps(lo, hi);
                let pair = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
                let single = _mm_add_ss(pair, _mm_shuffle_ps(pair, pair, 0b01));
                _mm_cvtss_f32(single)
            }
        }

        #[inline(always)]
        fn reduce_max(self) -> f32 {
            let mut buf = [0.0; LANES];
            self.store(&mut buf);
            buf.into_iter().fold(f32::NEG_INFINITY, f32::max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> [f32; LANES] {
        core::array::from_fn(|i| i as f32)
    }

    #[test]
    fn portable_reductions() {
        let r = Portable16::load(&ramp());
        assert_eq!(r.reduce_sum(), 120.0);
        assert_eq!(r.reduce_max(), 15.0);
        assert_eq!(Portable16::zero().reduce_sum(), 0.0);
    }

    #[test]
    fn portable_lanewise_ops() {
        let a = Portable16::load(&ramp());
        let b = Portable16::splat(2.0);
        let mut out = [0.0; LANES];
        a.mul(b).sub(a).store(&mut out);
        assert_eq!(out, ramp());
    }

    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    #[test]
    fn avx_matches_portable() {
        if !std::is_x86_feature_detected!("avx") {
            return;
        }
        #[target_feature(enable = "avx")]
        unsafe fn run() -> (f32, f32, [f32; LANES]) {
            let a = Avx16::load(&ramp());
            let mut out = [0.0; LANES];
            a.add(Avx16::splat(1.0)).store(&mut out);
            (a.reduce_sum(), a.reduce_max(), out)
        }
        // SAFETY: AVX was detected above.
        let (sum, max, shifted) = unsafe { run() };
        assert_eq!(sum, 120.0);
        assert_eq!(max, 15.0);
        assert_eq!(shifted, core::array::from_fn(|i| i as f32 + 1.0));
    }

    #[test]
    fn portable_max_skips_nan() {
        let mut holes = ramp();
        holes[3] = f32::NAN;
        let r = Portable16::load(&ramp()).max(Portable16::load(&holes));
        assert_eq!(r.reduce_max(), 15.0);
        let r = Portable16::load(&holes).max(Portable16::splat(f32::NAN));
        assert_eq!(r.reduce_max(), 15.0);
    }

    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    #[test]
    fn avx_max_skips_nan_like_portable() {
        if !std::is_x86_feature_detected!("avx") {
            return;
        }
        #[target_feature(enable = "avx")]
        unsafe fn run(a: &[f32; LANES], b: &[f32; LANES]) -> [f32; LANES] {
            let mut out = [0.0; LANES];
            Avx16::load(a).max(Avx16::load(b)).store(&mut out);
            out
        }
        let high = [100.0; LANES];
        let mut holes = ramp();
        holes[0] = f32::NAN;
        holes[9] = f32::NAN;
        // SAFETY: AVX was detected above.
        let (left, right) = unsafe { (run(&high, &holes), run(&holes, &high)) };
        assert_eq!(left, [100.0; LANES]);
        assert_eq!(right, [100.0; LANES]);

        let mut want = [0.0; LANES];
        Portable16::load(&holes).max(Portable16::splat(f32::NAN)).store(&mut want);
        // SAFETY: AVX was detected above.
        let got = unsafe { run(&holes, &[f32::NAN; LANES]) };
        for (g, w) in got.iter().zip(want) {
            assert_eq!(g.is_nan(), w.is_nan());
            assert!(g.is_nan() || *g == w);
        }
    }
}
