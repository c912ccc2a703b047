//! Capability probing and backend recommendation.
//!
//! SIMD and GPU availability are probed once, on first query, and cached for
//! the lifetime of the process. A failing GPU probe (no adapter, no driver,
//! the `wgpu` feature compiled out) reports the GPU as unavailable and is
//! never surfaced to the caller as an error.
//!
//! Recommendations never name a backend that probed unavailable.

use tracing::info;

use crate::backend::Backend;

/// Below this many elements the reference backend is always recommended.
pub const SMALL_PROBLEM_ELEMENTS: usize = 100;

/// From this many elements on the GPU is preferred when present.
pub const LARGE_PROBLEM_ELEMENTS: usize = 10_000;

/// Element-count thresholds for [`Capabilities::recommend_for_size_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionThresholds {
    /// Problems smaller than this run on the reference backend.
    pub small: usize,
    /// Problems at least this large prefer the GPU.
    pub large: usize,
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            small: SMALL_PROBLEM_ELEMENTS,
            large: LARGE_PROBLEM_ELEMENTS,
        }
    }
}

/// A snapshot of which accelerated backends are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// A vector unit backs the SIMD register.
    pub simd: bool,
    /// A GPU context could be created.
    pub gpu: bool,
}

impl Capabilities {
    /// Probed capabilities of this process. Cached after the first call.
    #[must_use]
    pub fn detect() -> Self {
        *CAPABILITIES
    }

    /// Whether `backend` can run here. The reference backend always can.
    #[must_use]
    pub const fn has(&self, backend: Backend) -> bool {
        match backend {
            Backend::Reference => true,
            Backend::Simd => self.simd,
            Backend::Gpu => self.gpu,
        }
    }

    /// The fastest available backend regardless of problem size.
    #[must_use]
    pub const fn recommend(&self) -> Backend {
        if self.gpu {
            Backend::Gpu
        } else if self.simd {
            Backend::Simd
        } else {
            Backend::Reference
        }
    }

    /// Recommendation for a problem of `elements` elements with the default
    /// thresholds.
    #[must_use]
    pub fn recommend_for_size(&self, elements: usize) -> Backend {
        self.recommend_for_size_with(elements, &SelectionThresholds::default())
    }

    /// Recommendation for a problem of `elements` elements.
    ///
    /// Small problems run on the reference backend, medium ones on SIMD when
    /// available, and large ones on the fastest available backend.
    #[must_use]
    pub fn recommend_for_size_with(&self, elements: usize, t: &SelectionThresholds) -> Backend {
        if elements < t.small {
            Backend::Reference
        } else if elements < t.large {
            if self.simd {
                Backend::Simd
            } else {
                Backend::Reference
            }
        } else {
            self.recommend()
        }
    }
}

lazy_static::lazy_static! {
    static ref CAPABILITIES: Capabilities = {
        let caps = Capabilities {
            simd: crate::simd::is_available(),
            gpu: probe_gpu(),
        };
        info!(simd = caps.simd, gpu = caps.gpu, "probed backend capabilities");
        caps
    };
}

#[cfg(feature = "wgpu")]
fn probe_gpu() -> bool {
    use tracing::warn;

    match crate::gpu::GpuContext::shared() {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "GPU unavailable");
            false
        }
    }
}

#[cfg(not(feature = "wgpu"))]
fn probe_gpu() -> bool {
    false
}

/// Whether the SIMD backend has a vector unit behind it.
#[must_use]
pub fn is_simd_available() -> bool {
    Capabilities::detect().simd
}

/// Whether a GPU context can be created. Never fails; errors read as `false`.
#[must_use]
pub fn is_gpu_available() -> bool {
    Capabilities::detect().gpu
}

/// Whether `backend` can run in this process.
#[must_use]
pub fn is_backend_available(backend: Backend) -> bool {
    Capabilities::detect().has(backend)
}

/// GPU, else SIMD, else reference, by availability.
#[must_use]
pub fn recommended_backend() -> Backend {
    Capabilities::detect().recommend()
}

/// Size-aware recommendation with the default thresholds.
#[must_use]
pub fn recommended_backend_for_size(elements: usize) -> Backend {
    Capabilities::detect().recommend_for_size(elements)
}

/// One-line description of `backend` and the workloads it suits.
#[must_use]
pub const fn describe(backend: Backend) -> &'static str {
    match backend {
        Backend::Gpu => "GPU (wgpu compute) - large matrices and batch operations",
        Backend::Simd => "SIMD (16-lane f32) - medium to large matrices on the CPU",
        Backend::Reference => "Reference (scalar loops) - small matrices and portability",
    }
}
