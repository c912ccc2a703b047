//! Device memory manager.
//!
//! # Handles
//!
//! A [`DeviceBuffer`] is an opaque token for one device allocation plus its
//! element count. It is neither `Clone` nor `Copy`, so exactly one host value
//! owns it. The null handle (id `0`) stands for "no allocation" and is what
//! empty uploads return. Ids are unique across every context in the process,
//! so a handle presented to a context that did not allocate it is never
//! mistaken for one of that context's own buffers.
//!
//! # Lifetime
//!
//! - [`MemoryManager::allocate_and_upload`] blocks until the data is on the
//!   device.
//! - [`MemoryManager::copy_from_device`] blocks until the data is on the host.
//! - [`MemoryManager::free`] is a no-op on the null handle and on a handle that
//!   was already freed; the first call removes the handle from the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use tracing::{debug, trace};
use wgpu::util::DeviceExt;

use super::context::GpuContext;
use crate::error::DeviceError;

const F32_BYTES: u64 = size_of::<f32>() as u64;

/// Next handle id, shared by all contexts. `0` is reserved for the null handle.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle to device-resident `f32` data.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceBuffer {
    id: u64,
    len: usize,
}

impl DeviceBuffer {
    /// The handle that refers to nothing.
    pub const NULL: Self = Self { id: 0, len: 0 };

    /// Whether this is the null handle.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Number of `f32` elements behind the handle.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the handle holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Allocation, transfer and release on one [`GpuContext`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryManager<'a> {
    ctx: &'a GpuContext,
}

impl<'a> MemoryManager<'a> {
    pub(crate) const fn new(ctx: &'a GpuContext) -> Self {
        Self { ctx }
    }

    fn check_size(&self, len: usize) -> Result<u64, DeviceError> {
        let requested = len as u64 * F32_BYTES;
        let limits = self.ctx.device.limits();
        let limit = u64::from(limits.max_storage_buffer_binding_size).min(limits.max_buffer_size);
        if requested > limit {
            return Err(DeviceError::AllocationTooLarge { requested, limit });
        }
        Ok(requested)
    }

    fn register(&self, buffer: wgpu::Buffer, len: usize) -> DeviceBuffer {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        trace!(id, bytes = len as u64 * F32_BYTES, "device alloc");
        self.ctx.buffers.lock().insert(id, Arc::new(buffer));
        DeviceBuffer { id, len }
    }

    /// Allocates device memory sized to `host` and copies it over.
    ///
    /// An empty slice yields [`DeviceBuffer::NULL`] without touching the device.
    pub fn allocate_and_upload(&self, host: &[f32]) -> Result<DeviceBuffer, DeviceError> {
        if host.is_empty() {
            return Ok(DeviceBuffer::NULL);
        }
        self.check_size(host.len())?;
        let buffer = self
            .ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("upload"),
                contents: bytemuck::cast_slice(host),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            });
        Ok(self.register(buffer, host.len()))
    }

    /// Allocates zero-initialized device memory for `len` elements.
    pub fn allocate(&self, len: usize) -> Result<DeviceBuffer, DeviceError> {
        if len == 0 {
            return Ok(DeviceBuffer::NULL);
        }
        let size = self.check_size(len)?;
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("output"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(self.register(buffer, len))
    }

    /// Copies the first `count` elements of `handle` into `host`.
    ///
    /// `host` must already hold at least `count` elements.
    pub fn copy_from_device(
        &self,
        handle: &DeviceBuffer,
        host: &mut [f32],
        count: usize,
    ) -> Result<(), DeviceError> {
        if count > host.len() {
            return Err(DeviceError::ShortBuffer {
                requested: count,
                available: host.len(),
            });
        }
        if count == 0 {
            return Ok(());
        }
        if count > handle.len {
            return Err(DeviceError::ShortBuffer {
                requested: count,
                available: handle.len,
            });
        }
        let source = self.buffer(handle)?;
        let size = count as u64 * F32_BYTES;

        let staging = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("download_encoder"),
            });
        encoder.copy_buffer_to_buffer(&source, 0, &staging, 0, size);
        self.ctx.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.ctx
            .device
            .poll(wgpu::PollType::Wait)
            .map_err(|e| DeviceError::Poll(e.to_string()))?;
        rx.recv()
            .map_err(|e| DeviceError::Map(e.to_string()))?
            .map_err(|e| DeviceError::Map(e.to_string()))?;

        {
            let view = slice.get_mapped_range();
            host[..count].copy_from_slice(bytemuck::cast_slice(&view));
        }
        staging.unmap();
        staging.destroy();
        Ok(())
    }

    /// Releases the memory behind `handle`.
    ///
    /// No-op for the null handle, for a handle that was already freed and for
    /// a handle allocated by another context.
    pub fn free(&self, handle: &DeviceBuffer) {
        if handle.is_null() {
            return;
        }
        match self.ctx.buffers.lock().remove(&handle.id) {
            Some(buffer) => {
                trace!(id = handle.id, bytes = buffer.size(), "device free");
                buffer.destroy();
            }
            None => debug!(id = handle.id, "ignoring free of a handle this context does not hold"),
        }
    }

    /// Number of allocations currently registered on the context.
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.ctx.buffers.lock().len()
    }

    pub(crate) fn buffer(&self, handle: &DeviceBuffer) -> Result<Arc<wgpu::Buffer>, DeviceError> {
        self.ctx
            .buffers
            .lock()
            .get(&handle.id)
            .cloned()
            .ok_or(DeviceError::StaleHandle(handle.id))
    }
}
