//! Compute dispatch for the device kernels.
//!
//! Each function allocates a fresh output handle, binds its inputs, submits
//! one compute pass and blocks until the queue drains. Inputs are borrowed
//! `wgpu` buffers so an operand may appear on both sides.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::context::GpuContext;
use super::memory::DeviceBuffer;
use crate::error::DeviceError;

/// Threads per workgroup in the 1-D kernels.
const LINEAR_GROUP: u32 = 256;
/// Side of the square workgroups in the 2-D kernels.
const TILE: u32 = 16;
/// Per-dimension workgroup count every adapter accepts.
const MAX_GROUPS: u32 = 65_535;
/// Rows or columns one 2-D dispatch covers.
const GRID_SPAN: usize = MAX_GROUPS as usize * TILE as usize;

/// Operation codes understood by `elementwise.wgsl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub(crate) enum ElementOp {
    Add = 0,
    Sub = 1,
    Scale = 2,
    AddScalar = 3,
    ScalarSub = 4,
}

impl ElementOp {
    const fn is_binary(self) -> bool {
        matches!(self, Self::Add | Self::Sub)
    }
}

fn linear_groups(len: u32, group: u32) -> (u32, u32) {
    let groups = len.div_ceil(group);
    if groups <= MAX_GROUPS {
        (groups.max(1), 1)
    } else {
        (MAX_GROUPS, groups.div_ceil(MAX_GROUPS))
    }
}

/// Splits a `rows x cols` grid into dispatches that stay within
/// [`MAX_GROUPS`] per dimension, as `(row_offset, col_offset, groups)`.
fn grid_tiles(rows: usize, cols: usize) -> impl Iterator<Item = (u32, u32, (u32, u32))> {
    (0..rows).step_by(GRID_SPAN).flat_map(move |row| {
        (0..cols).step_by(GRID_SPAN).map(move |col| {
            let height = (rows - row).min(GRID_SPAN) as u32;
            let width = (cols - col).min(GRID_SPAN) as u32;
            let groups = (width.div_ceil(TILE), height.div_ceil(TILE));
            (row as u32, col as u32, groups)
        })
    })
}

fn dispatch(
    ctx: &GpuContext,
    label: &str,
    pipeline: &wgpu::ComputePipeline,
    params: &[u32],
    (lhs, rhs): (&wgpu::Buffer, &wgpu::Buffer),
    out: &wgpu::Buffer,
    (groups_x, groups_y): (u32, u32),
) -> Result<(), DeviceError> {
    let device = &ctx.device;
    let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("params"),
        contents: bytemuck::cast_slice(params),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &ctx.pipelines.layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: lhs.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: rhs.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: out.as_entire_binding(),
            },
        ],
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(label),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(groups_x, groups_y, 1);
    }
    ctx.queue.submit(Some(encoder.finish()));
    device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| DeviceError::Poll(e.to_string()))?;
    Ok(())
}

/// Runs a 16x16-tiled kernel over `rows x cols` outputs, one dispatch per
/// grid tile. The tile origin goes into the second half of the uniform.
fn dispatch_grid(
    ctx: &GpuContext,
    label: &str,
    pipeline: &wgpu::ComputePipeline,
    dims: [u32; 4],
    inputs: (&wgpu::Buffer, &wgpu::Buffer),
    out: &wgpu::Buffer,
    (rows, cols): (usize, usize),
) -> Result<(), DeviceError> {
    for (row, col, groups) in grid_tiles(rows, cols) {
        let params = [dims[0], dims[1], dims[2], dims[3], row, col, 0, 0];
        dispatch(ctx, label, pipeline, &params, inputs, out, groups)?;
    }
    Ok(())
}

fn output(
    ctx: &GpuContext,
    len: usize,
) -> Result<(DeviceBuffer, Option<Arc<wgpu::Buffer>>), DeviceError> {
    let memory = ctx.memory();
    let handle = memory.allocate(len)?;
    if handle.is_null() {
        return Ok((handle, None));
    }
    let buffer = memory.buffer(&handle)?;
    Ok((handle, Some(buffer)))
}

/// `(m x k) * (k x n)`. With `k == 0` the zeroed output is returned as is.
pub(crate) fn matmul(
    ctx: &GpuContext,
    a: Option<&wgpu::Buffer>,
    b: Option<&wgpu::Buffer>,
    (m, k, n): (usize, usize, usize),
) -> Result<DeviceBuffer, DeviceError> {
    let (handle, out) = output(ctx, m * n)?;
    if let (Some(a), Some(b), Some(out)) = (a, b, out) {
        let dims = [m as u32, k as u32, n as u32, 0];
        let pipeline = &ctx.pipelines.matmul;
        if let Err(e) = dispatch_grid(ctx, "matmul", pipeline, dims, (a, b), &out, (m, n)) {
            ctx.memory().free(&handle);
            return Err(e);
        }
    }
    Ok(handle)
}

/// `(m x n) * (n x 1)`.
pub(crate) fn matvec(
    ctx: &GpuContext,
    a: Option<&wgpu::Buffer>,
    x: Option<&wgpu::Buffer>,
    (m, n): (usize, usize),
) -> Result<DeviceBuffer, DeviceError> {
    let (handle, out) = output(ctx, m)?;
    if let (Some(a), Some(x), Some(out)) = (a, x, out) {
        let groups = linear_groups(m as u32, 64);
        let params = [m as u32, n as u32, 0, 0];
        if let Err(e) = dispatch(ctx, "matvec", &ctx.pipelines.matvec, &params, (a, x), &out, groups) {
            ctx.memory().free(&handle);
            return Err(e);
        }
    }
    Ok(handle)
}

/// Elementwise kernel over `len` elements. Scalar ops ignore `b`.
pub(crate) fn elementwise(
    ctx: &GpuContext,
    op: ElementOp,
    a: Option<&wgpu::Buffer>,
    b: Option<&wgpu::Buffer>,
    scalar: f32,
    len: usize,
) -> Result<DeviceBuffer, DeviceError> {
    debug_assert!(!op.is_binary() || b.is_some() || len == 0);
    let (handle, out) = output(ctx, len)?;
    if let (Some(a), Some(out)) = (a, out) {
        let b = if op.is_binary() { b.unwrap_or(a) } else { a };
        let params = [len as u32, op as u32, scalar.to_bits(), 0];
        let groups = linear_groups(len as u32, LINEAR_GROUP);
        let pipeline = &ctx.pipelines.elementwise;
        if let Err(e) = dispatch(ctx, "elementwise", pipeline, &params, (a, b), &out, groups) {
            ctx.memory().free(&handle);
            return Err(e);
        }
    }
    Ok(handle)
}

/// Row-major transpose of a `rows x cols` buffer.
pub(crate) fn transpose(
    ctx: &GpuContext,
    a: Option<&wgpu::Buffer>,
    (rows, cols): (usize, usize),
) -> Result<DeviceBuffer, DeviceError> {
    let (handle, out) = output(ctx, rows * cols)?;
    if let (Some(a), Some(out)) = (a, out) {
        let dims = [rows as u32, cols as u32, 0, 0];
        let pipeline = &ctx.pipelines.transpose;
        if let Err(e) = dispatch_grid(ctx, "transpose", pipeline, dims, (a, a), &out, (rows, cols)) {
            ctx.memory().free(&handle);
            return Err(e);
        }
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_groups_spill_into_y() {
        assert_eq!(linear_groups(1, LINEAR_GROUP), (1, 1));
        assert_eq!(linear_groups(256, LINEAR_GROUP), (1, 1));
        assert_eq!(linear_groups(257, LINEAR_GROUP), (2, 1));
        let huge = MAX_GROUPS * LINEAR_GROUP + 1;
        assert_eq!(linear_groups(huge, LINEAR_GROUP), (MAX_GROUPS, 2));
    }

    #[test]
    fn grid_tiles_respect_the_group_limit() {
        assert_eq!(grid_tiles(0, 5).count(), 0);
        assert_eq!(grid_tiles(16, 17).collect::<Vec<_>>(), vec![(0, 0, (2, 1))]);

        let tall: Vec<_> = grid_tiles(1_100_000, 1).collect();
        assert_eq!(tall, vec![(0, 0, (1, MAX_GROUPS)), (1_048_560, 0, (1, 3215))]);

        let wide: Vec<_> = grid_tiles(3, GRID_SPAN + 1).collect();
        assert_eq!(wide, vec![(0, 0, (MAX_GROUPS, 1)), (0, GRID_SPAN as u32, (1, 1))]);
    }
}
