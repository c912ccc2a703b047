#![cfg(feature = "wgpu")]

use std::sync::Arc;

use briny_linalg::contract::{MatrixOps, VectorOps};
use briny_linalg::error::{DeviceError, MatrixError};
use briny_linalg::gpu::{DeviceBuffer, GpuColumnVector, GpuContext, GpuMatrix};

/// Private context so allocation counts are not disturbed by other tests.
fn context() -> Option<Arc<GpuContext>> {
    GpuContext::new().ok().map(Arc::new)
}

#[test]
fn test_upload_download_round_trip() {
    let Some(ctx) = context() else { return };
    let memory = ctx.memory();
    let data: Vec<f32> = (0..1000).map(|i| i as f32 * 0.5).collect();
    let handle = memory.allocate_and_upload(&data).unwrap();
    assert_eq!(handle.len(), 1000);

    let mut host = vec![0.0; 1000];
    memory.copy_from_device(&handle, &mut host, 1000).unwrap();
    assert_eq!(host, data);

    let mut partial = vec![-1.0; 4];
    memory.copy_from_device(&handle, &mut partial, 3).unwrap();
    assert_eq!(partial, vec![0.0, 0.5, 1.0, -1.0]);
    memory.free(&handle);
}

#[test]
fn test_short_destination_is_rejected() {
    let Some(ctx) = context() else { return };
    let memory = ctx.memory();
    let handle = memory.allocate_and_upload(&[1.0, 2.0, 3.0]).unwrap();
    let mut host = vec![0.0; 2];
    assert!(matches!(
        memory.copy_from_device(&handle, &mut host, 3),
        Err(DeviceError::ShortBuffer { requested: 3, available: 2 })
    ));
    assert_eq!(host, vec![0.0, 0.0]);
    memory.free(&handle);
}

#[test]
fn test_double_free_and_null_free_are_noops() {
    let Some(ctx) = context() else { return };
    let memory = ctx.memory();
    memory.free(&DeviceBuffer::NULL);
    assert!(memory.allocate_and_upload(&[]).unwrap().is_null());

    let handle = memory.allocate_and_upload(&[1.0, 2.0]).unwrap();
    assert_eq!(memory.live_allocations(), 1);
    memory.free(&handle);
    memory.free(&handle);
    assert_eq!(memory.live_allocations(), 0);

    let mut host = [0.0; 2];
    assert!(matches!(
        memory.copy_from_device(&handle, &mut host, 2),
        Err(DeviceError::StaleHandle(_))
    ));

    // the context keeps working after the redundant frees
    let a = GpuMatrix::from_vec_in(ctx.clone(), 1, 2, vec![1.0, 2.0]).unwrap();
    assert_eq!(a.add(&a).unwrap().to_vec().unwrap(), vec![2.0, 4.0]);
}

#[test]
fn test_values_free_device_memory_on_drop() {
    let Some(ctx) = context() else { return };
    {
        let a = GpuMatrix::from_vec_in(ctx.clone(), 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(ctx.memory().live_allocations(), 0);
        let b = a.transpose().unwrap();
        assert_eq!(ctx.memory().live_allocations(), 2);
        let c = a.multiply(&b).unwrap();
        assert_eq!(ctx.memory().live_allocations(), 3);
        assert_eq!(c.to_vec().unwrap(), vec![5.0, 11.0, 11.0, 25.0]);
    }
    assert_eq!(ctx.memory().live_allocations(), 0);
}

#[test]
fn test_release_keeps_value_usable() {
    let Some(ctx) = context() else { return };
    let a = GpuColumnVector::from_vec_in(ctx.clone(), vec![1.0, 2.0, 3.0]);
    let mut b = a.scale(2.0).unwrap();
    assert!(b.is_on_device());
    b.release().unwrap();
    b.release().unwrap();
    assert!(!b.is_on_device());
    assert_eq!(b.to_vec().unwrap(), vec![2.0, 4.0, 6.0]);
    assert_eq!(b.add(&a).unwrap().to_vec().unwrap(), vec![3.0, 6.0, 9.0]);
}

#[test]
fn test_contexts_do_not_mix() {
    let (Some(first), Some(second)) = (context(), context()) else {
        return;
    };
    let a = GpuColumnVector::from_vec_in(first.clone(), vec![1.0]);
    let b = GpuColumnVector::from_vec_in(second.clone(), vec![1.0]);
    assert!(matches!(
        a.add(&b),
        Err(MatrixError::Device(DeviceError::ContextMismatch))
    ));
    // the rejected call uploads nothing
    assert!(!a.is_on_device());
    assert!(!b.is_on_device());
    assert_eq!(first.memory().live_allocations(), 0);
    assert_eq!(second.memory().live_allocations(), 0);

    let m = GpuMatrix::from_vec_in(first.clone(), 1, 1, vec![1.0]).unwrap();
    let n = GpuMatrix::from_vec_in(second, 1, 1, vec![1.0]).unwrap();
    assert!(m.subtract(&n).is_err());
    assert!(!m.is_on_device());
}

#[test]
fn test_foreign_free_leaves_other_context_intact() {
    let (Some(first), Some(second)) = (context(), context()) else {
        return;
    };
    let ours = first.memory().allocate_and_upload(&[1.0, 2.0]).unwrap();
    let theirs = second.memory().allocate_and_upload(&[3.0, 4.0]).unwrap();
    assert_ne!(ours, theirs);

    second.memory().free(&ours);
    assert_eq!(second.memory().live_allocations(), 1);
    assert_eq!(first.memory().live_allocations(), 1);

    let mut host = [0.0; 2];
    second.memory().copy_from_device(&theirs, &mut host, 2).unwrap();
    assert_eq!(host, [3.0, 4.0]);
    assert!(matches!(
        second.memory().copy_from_device(&ours, &mut host, 2),
        Err(DeviceError::StaleHandle(_))
    ));
    first.memory().copy_from_device(&ours, &mut host, 2).unwrap();
    assert_eq!(host, [1.0, 2.0]);

    let m = GpuMatrix::from_vec_in(second.clone(), 1, 2, vec![1.0, 1.0]).unwrap();
    assert_eq!(m.add(&m).unwrap().to_vec().unwrap(), vec![2.0, 2.0]);

    first.memory().free(&ours);
    second.memory().free(&theirs);
}

#[test]
fn test_tall_shapes_exceed_one_dispatch() {
    let Some(ctx) = context() else { return };
    // more rows than 65,535 workgroups of 16 can cover in one dispatch
    let rows = 1_100_000;
    let data = (0..rows).map(|i| (i % 7) as f32).collect();
    let column = GpuColumnVector::from_vec_in(ctx.clone(), data);
    let two = GpuColumnVector::from_vec_in(ctx.clone(), vec![2.0]);
    let tall = column.outer_product(&two).unwrap();
    assert_eq!((tall.rows(), tall.cols()), (rows, 1));
    let values = tall.to_vec().unwrap();
    assert!(values.iter().enumerate().all(|(i, &v)| v == 2.0 * (i % 7) as f32));

    let wide = tall.transpose().unwrap();
    assert_eq!((wide.rows(), wide.cols()), (1, rows));
    assert_eq!(wide.get(0, rows - 1).unwrap(), values[rows - 1]);
    assert_eq!(wide.to_vec().unwrap(), values);
}

#[test]
fn test_host_fallbacks_match_reference() {
    let Some(ctx) = context() else { return };
    let input = GpuMatrix::from_vec_in(ctx.clone(), 3, 3, (1..=9).map(|x| x as f32).collect())
        .unwrap();
    let kernel = GpuMatrix::from_vec_in(ctx, 2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
    let want = input
        .to_reference()
        .unwrap()
        .convolution(&kernel.to_reference().unwrap())
        .unwrap();
    let got = input.convolution(&kernel).unwrap();
    assert_eq!(got.to_reference().unwrap(), want);
    assert_eq!(input.hadamard_product(&input).unwrap().get(2, 2).unwrap(), 81.0);
    assert_eq!(input.unroll().unwrap().max().unwrap(), 9.0);
}
