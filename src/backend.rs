//! Backend identifiers and the process-wide default backend.
//!
//! # Supported Backends
//!
//! - `Reference`: plain nested loops, the correctness oracle. Always available.
//! - `Simd`: 16-lane vector kernels with scalar remainder handling.
//! - `Gpu`: `wgpu` compute kernels over device-resident buffers (feature `wgpu`).
//!
//! The default backend is stored globally in an `AtomicU8` and consulted by
//! the `*_default` constructors in [`crate::factory`]. It never changes how an
//! existing value computes; values are always bound to the backend they were
//! created on.

use core::convert::TryFrom;
use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of the interchangeable execution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Backend {
    /// Portable scalar implementation.
    Reference = 0,
    /// CPU SIMD implementation (default).
    #[default]
    Simd,
    /// Discrete accelerator implementation.
    Gpu,
}

impl Backend {
    /// All backends, slowest-to-set-up first.
    pub const ALL: [Self; 3] = [Self::Reference, Self::Simd, Self::Gpu];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Simd => "simd",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Reference),
            1 => Ok(Self::Simd),
            2 => Ok(Self::Gpu),
            _ => Err(()),
        }
    }
}

/// Internal global state for the default backend.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Simd as u8);

/// Sets the backend used by the `*_default` factories.
///
/// # Example
///
/// ```
/// use briny_linalg::backend::{default_backend, set_default_backend, Backend};
/// set_default_backend(Backend::Reference);
/// assert_eq!(default_backend(), Backend::Reference);
/// ```
pub fn set_default_backend(b: Backend) {
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the backend used by the `*_default` factories.
///
/// If the stored value is invalid, defaults to [`Backend::Simd`].
#[must_use]
pub fn default_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for b in Backend::ALL {
            assert_eq!(Backend::try_from(b as u8), Ok(b));
        }
        assert_eq!(Backend::try_from(9), Err(()));
    }

    #[test]
    fn names_are_lowercase() {
        assert_eq!(Backend::Gpu.to_string(), "gpu");
        assert_eq!(Backend::default(), Backend::Simd);
    }
}
