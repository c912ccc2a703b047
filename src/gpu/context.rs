//! The device context: adapter, device, queue, compiled kernels and the
//! handle registry backing the memory manager.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::memory::MemoryManager;
use crate::error::DeviceError;

const MATMUL: &str = include_str!("shaders/matmul.wgsl");
const MATVEC: &str = include_str!("shaders/matvec.wgsl");
const ELEMENTWISE: &str = include_str!("shaders/elementwise.wgsl");
const TRANSPOSE: &str = include_str!("shaders/transpose.wgsl");

/// Compiled compute pipelines.
///
/// Every kernel uses the same bind group shape:
/// `0` uniform parameters (`[u32; 4]`, or `[u32; 8]` with a tile origin for
/// the 2-D kernels), `1` and `2` read-only inputs, `3` read-write output.
pub(crate) struct Pipelines {
    pub layout: wgpu::BindGroupLayout,
    pub matmul: wgpu::ComputePipeline,
    pub matvec: wgpu::ComputePipeline,
    pub elementwise: wgpu::ComputePipeline,
    pub transpose: wgpu::ComputePipeline,
}

impl Pipelines {
    fn new(device: &wgpu::Device) -> Self {
        let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("kernel_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage(1, true),
                storage(2, true),
                storage(3, false),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("kernel_pipeline_layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let compile = |label: &str, source: &str| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                cache: None,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            })
        };

        Self {
            matmul: compile("matmul", MATMUL),
            matvec: compile("matvec", MATVEC),
            elementwise: compile("elementwise", ELEMENTWISE),
            transpose: compile("transpose", TRANSPOSE),
            layout,
        }
    }
}

/// Holds the `wgpu` device and queue used for every GPU value.
///
/// Create one with [`GpuContext::new`] and pass it to the `*_in`
/// constructors, or use [`GpuContext::shared`] for the process-wide instance.
pub struct GpuContext {
    /// The logical device.
    pub device: wgpu::Device,
    /// Submission queue of [`Self::device`].
    pub queue: wgpu::Queue,
    info: wgpu::AdapterInfo,
    pub(crate) pipelines: Pipelines,
    pub(crate) buffers: Mutex<HashMap<u64, Arc<wgpu::Buffer>>>,
}

impl GpuContext {
    /// Selects the default adapter, creates a device and compiles every kernel.
    ///
    /// Blocks on the asynchronous `wgpu` requests with `pollster`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::Adapter`] when no adapter is found and
    /// [`DeviceError::Device`] when the adapter refuses the device request.
    pub fn new() -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::default();
        let adapter =
            pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
                .map_err(|e| DeviceError::Adapter(e.to_string()))?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("briny_linalg"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| DeviceError::Device(e.to_string()))?;

        let info = adapter.get_info();
        info!(adapter = %info.name, backend = ?info.backend, "created GPU context");

        Ok(Self {
            pipelines: Pipelines::new(&device),
            device,
            queue,
            info,
            buffers: Mutex::new(HashMap::new()),
        })
    }

    /// The process-wide context, created on first call and never recreated.
    ///
    /// Concurrent first calls block until the single initialization finishes.
    /// A failed or panicking initialization is remembered and reported as
    /// [`DeviceError::Unavailable`] by every later call.
    pub fn shared() -> Result<Arc<Self>, DeviceError> {
        (*SHARED).clone().map_err(|_| DeviceError::Unavailable)
    }

    /// Adapter the device was created on.
    #[must_use]
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.info
    }

    /// Device memory operations on this context.
    #[must_use]
    pub fn memory(&self) -> MemoryManager<'_> {
        MemoryManager::new(self)
    }
}

impl core::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.info.name)
            .field("backend", &self.info.backend)
            .field("live_allocations", &self.buffers.lock().len())
            .finish()
    }
}

/// Runs `init`, turning a panic inside the driver stack into an error.
fn unwind_to_error<T>(init: impl FnOnce() -> Result<T, DeviceError>) -> Result<T, DeviceError> {
    panic::catch_unwind(AssertUnwindSafe(init)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        Err(DeviceError::Device(format!("initialization panicked: {message}")))
    })
}

lazy_static::lazy_static! {
    static ref SHARED: Result<Arc<GpuContext>, DeviceError> = unwind_to_error(GpuContext::new)
        .map(Arc::new)
        .inspect_err(|e| warn!(error = %e, "GPU context initialization failed"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panicking_initialization_becomes_an_error() {
        let result: Result<(), _> = unwind_to_error(|| panic!("driver exploded"));
        match result {
            Err(DeviceError::Device(message)) => assert!(message.contains("driver exploded")),
            other => panic!("unexpected {other:?}"),
        }
        let formatted: Result<(), _> = unwind_to_error(|| panic!("code {}", 7));
        assert!(matches!(formatted, Err(DeviceError::Device(m)) if m.contains("code 7")));
        assert_eq!(unwind_to_error(|| Ok(3)).ok(), Some(3));
    }

    #[test]
    fn shared_never_panics() {
        for _ in 0..2 {
            let _ = GpuContext::shared();
        }
    }
}
