//! Host/device residency shared by [`GpuMatrix`](super::GpuMatrix) and
//! [`GpuColumnVector`](super::GpuColumnVector).
//!
//! A value holds a host copy, a device copy, or both. Device memory is
//! allocated on the first kernel that needs it; the host copy is downloaded on
//! the first read. Mutation goes through the host copy and drops the device
//! copy.

use std::sync::Arc;

use parking_lot::Mutex;

use super::context::GpuContext;
use super::memory::DeviceBuffer;
use crate::error::{DeviceError, Result};

#[derive(Debug, Default)]
struct Copies {
    host: Option<Vec<f32>>,
    device: Option<DeviceBuffer>,
}

#[derive(Debug)]
pub(crate) struct Resident {
    ctx: Arc<GpuContext>,
    len: usize,
    copies: Mutex<Copies>,
}

impl Resident {
    pub fn from_host(ctx: Arc<GpuContext>, data: Vec<f32>) -> Self {
        Self {
            ctx,
            len: data.len(),
            copies: Mutex::new(Copies {
                host: Some(data),
                device: None,
            }),
        }
    }

    pub fn from_device(ctx: Arc<GpuContext>, handle: DeviceBuffer) -> Self {
        if handle.is_null() {
            return Self::from_host(ctx, Vec::new());
        }
        Self {
            ctx,
            len: handle.len(),
            copies: Mutex::new(Copies {
                host: None,
                device: Some(handle),
            }),
        }
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn same_context(&self, other: &Self) -> Result<()> {
        if Arc::ptr_eq(&self.ctx, &other.ctx) {
            Ok(())
        } else {
            Err(DeviceError::ContextMismatch.into())
        }
    }

    /// Device buffer, uploading the host copy first if needed.
    /// `None` for empty values.
    pub fn buffer(&self) -> Result<Option<Arc<wgpu::Buffer>>> {
        if self.len == 0 {
            return Ok(None);
        }
        let memory = self.ctx.memory();
        let mut copies = self.copies.lock();
        if copies.device.is_none() {
            let handle = memory.allocate_and_upload(copies.host.as_deref().unwrap_or_default())?;
            copies.device = Some(handle);
        }
        match &copies.device {
            Some(handle) => Ok(Some(memory.buffer(handle)?)),
            None => Ok(None),
        }
    }

    fn ensure_host(ctx: &GpuContext, copies: &mut Copies, len: usize) -> Result<()> {
        if copies.host.is_some() {
            return Ok(());
        }
        let mut host = vec![0.0; len];
        if let Some(handle) = &copies.device {
            ctx.memory().copy_from_device(handle, &mut host, len)?;
        }
        copies.host = Some(host);
        Ok(())
    }

    /// Runs `f` over the host copy, downloading it first if needed.
    pub fn with_host<T>(&self, f: impl FnOnce(&[f32]) -> T) -> Result<T> {
        let mut copies = self.copies.lock();
        Self::ensure_host(&self.ctx, &mut copies, self.len)?;
        Ok(f(copies.host.as_deref().unwrap_or_default()))
    }

    /// Mutable host copy. The device copy is freed since it goes stale.
    pub fn host_mut(&mut self) -> Result<&mut [f32]> {
        let copies = self.copies.get_mut();
        Self::ensure_host(&self.ctx, copies, self.len)?;
        if let Some(handle) = copies.device.take() {
            self.ctx.memory().free(&handle);
        }
        Ok(copies.host.get_or_insert_with(Vec::new))
    }

    /// Downloads if needed, then frees the device copy.
    pub fn release(&mut self) -> Result<()> {
        let copies = self.copies.get_mut();
        Self::ensure_host(&self.ctx, copies, self.len)?;
        if let Some(handle) = copies.device.take() {
            self.ctx.memory().free(&handle);
        }
        Ok(())
    }

    pub fn is_on_device(&self) -> bool {
        self.copies.lock().device.is_some()
    }
}

impl Drop for Resident {
    fn drop(&mut self) {
        if let Some(handle) = self.copies.get_mut().device.take() {
            self.ctx.memory().free(&handle);
        }
    }
}
