//! Error taxonomy shared by every backend.
//!
//! Three families of failure exist:
//!
//! - **Shape errors** ([`MatrixError::DimensionMismatch`] and friends) are
//!   raised before any result is allocated, so a failed call never leaves a
//!   partially written value behind.
//! - **Unsupported operations** ([`MatrixError::Unsupported`]) for
//!   operand/backend combinations that have no implementation, e.g. row
//!   vectors on the SIMD backend.
//! - **Device errors** ([`MatrixError::Device`]) for allocation, transfer and
//!   initialization failures on the accelerator. These are hard failures;
//!   only capability probing in [`crate::selector`] converts them into
//!   "unavailable".

use crate::backend::Backend;
use crate::shape::Shape;
use thiserror::Error;

/// Convenient result type for matrix operations.
pub type Result<T> = core::result::Result<T, MatrixError>;

/// Errors raised by matrix and vector operations.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// Operand shapes are incompatible for the requested operation.
    #[error("dimension mismatch in `{op}`: left is {left}, right is {right}")]
    DimensionMismatch {
        /// The operation that rejected its operands.
        op: &'static str,
        /// Shape of the left operand (or `self`).
        left: Shape,
        /// Shape of the right operand.
        right: Shape,
    },

    /// An element index lies outside the value.
    #[error("index ({row}, {col}) is out of bounds for shape {shape}")]
    IndexOutOfBounds {
        /// Requested row.
        row: usize,
        /// Requested column.
        col: usize,
        /// Shape of the indexed value.
        shape: Shape,
    },

    /// The operation has no implementation on this backend.
    #[error("`{op}` is not supported on the {backend} backend")]
    Unsupported {
        /// The rejected operation.
        op: &'static str,
        /// Backend that was asked to perform it.
        backend: Backend,
    },

    /// Operands live on different backends.
    #[error("operands live on different backends: {left} and {right}")]
    BackendMismatch {
        /// Backend of the left operand.
        left: Backend,
        /// Backend of the right operand.
        right: Backend,
    },

    /// Tensor operands carry different tags.
    #[error("tensor kinds differ: {left} and {right}")]
    TensorKindMismatch {
        /// Tag of the left tensor.
        left: &'static str,
        /// Tag of the right tensor.
        right: &'static str,
    },

    /// Matrix-list tensors hold a different number of channels.
    #[error("channel counts differ: {left} and {right}")]
    ChannelCountMismatch {
        /// Channels in the left tensor.
        left: usize,
        /// Channels in the right tensor.
        right: usize,
    },

    /// The operation needs at least one element.
    #[error("`{op}` requires a non-empty operand")]
    Empty {
        /// The rejected operation.
        op: &'static str,
    },

    /// `set_random` bounds do not describe a finite range.
    #[error("invalid random range [{min}, {max})")]
    InvalidRange {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// A host buffer does not match the declared shape.
    #[error("expected {expected} elements, got {actual}")]
    InvalidData {
        /// Element count implied by the shape.
        expected: usize,
        /// Length of the supplied buffer.
        actual: usize,
    },

    /// Accelerator failure.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl MatrixError {
    pub(crate) const fn mismatch(op: &'static str, left: Shape, right: Shape) -> Self {
        Self::DimensionMismatch { op, left, right }
    }
}

/// Failures at the device boundary.
#[derive(Debug, Clone, Error)]
pub enum DeviceError {
    /// No compatible adapter could be found.
    #[error("no compatible GPU adapter: {0}")]
    Adapter(String),

    /// The adapter refused to create a device.
    #[error("device request failed: {0}")]
    Device(String),

    /// The shared device context failed to initialize earlier in the process.
    #[error("the shared GPU context is unavailable")]
    Unavailable,

    /// An allocation exceeds what the device can bind.
    #[error("allocation of {requested} bytes exceeds the device limit of {limit} bytes")]
    AllocationTooLarge {
        /// Requested size in bytes.
        requested: u64,
        /// Largest bindable buffer in bytes.
        limit: u64,
    },

    /// A handle does not refer to live device memory.
    #[error("device handle {0} is not live")]
    StaleHandle(u64),

    /// A download destination is smaller than the requested count.
    #[error("download of {requested} elements into a buffer of {available}")]
    ShortBuffer {
        /// Elements requested.
        requested: usize,
        /// Elements the destination can hold.
        available: usize,
    },

    /// Mapping a staging buffer for readback failed.
    #[error("buffer mapping failed: {0}")]
    Map(String),

    /// Operands were created on different device contexts.
    #[error("operands belong to different device contexts")]
    ContextMismatch,

    /// Waiting on the device queue failed.
    #[error("device poll failed: {0}")]
    Poll(String),
}
