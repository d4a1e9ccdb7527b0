//! Reference-counted strided matrices for neural-network toolkits.
//!
//! A [`Matrix`] is an N-dimensional view (dims, strides, offset, major order)
//! over a shared [`MemoryBlock`]. Sub-matrices, transposes, rewraps and
//! shallow copies share the block and never copy element data; deep clones
//! always produce a fresh contiguous buffer.
//!
//! # Core Types
//!
//! - [`Matrix`]: the strided tensor
//! - [`MemoryBlock`]: the shared element buffer, with a device-stale flag
//! - [`Cursor`], [`Iter`], [`IterMut`]: traversal in [`RowMajor`] or [`ColMajor`] order
//! - [`SlidingWindow`] / [`WindowConfig`]: zero-copy patch extraction
//!
//! # Operations
//!
//! - Element-wise: `fill`, `zeros`, `ones`, `scale`, `clamp`, `log`, `exp`,
//!   `sqrt`, `pow`, `tanh`, `add`, `subtract`, `elementwise_multiply`, ...
//! - Reductions: `sum`, `min`, `max`, `min_and_max`, `norm2`, `equals`
//! - BLAS-delegated: `copy_from`, `axpy`, `gemm`, `gemv`, `ger`, `dot`
//!
//! BLAS-delegated operations use CBLAS (feature `blas`) when every operand has a
//! BLAS-expressible stride pattern, and the iterator-based generic path otherwise.
//!
//! # Example
//!
//! ```rust
//! use strided_matrix::{MajorOrder, Matrix};
//!
//! let m = Matrix::from_vec(&[3, 4], MajorOrder::RowMajor, (0..12).map(|x| x as f64).collect())
//!     .unwrap();
//! let sub = m.sub_view(&[1, 0], &[2, 2], false).unwrap();
//! assert_eq!(sub.to_vec().unwrap(), vec![4.0, 5.0, 8.0, 9.0]);
//!
//! sub.set(&[0, 0], 99.0).unwrap();
//! assert_eq!(m.get(&[1, 0]).unwrap(), 99.0);
//! ```
//!
//! # Concurrency
//!
//! Buffers are shared through `Arc` and guarded by a non-blocking lock: an
//! operation that cannot take the lock fails with [`StridedError::BufferLocked`]
//! instead of waiting. Use [`Matrix::deep_clone`] to obtain a private copy
//! before handing data to another thread.

pub mod blas;
mod iter;
mod layout;
pub mod linalg;
mod matrix;
mod memory;
mod ops;
mod order;
mod sliding;

pub use iter::{ColIter, ColIterMut, Cursor, Iter, IterMut, RowIter, RowIterMut};
pub use iter::{ColMajor, RowMajor, TraversalOrder};
pub use layout::{canonical_strides, col_major_strides, row_major_strides, MajorOrder};
pub use linalg::Transpose;
pub use matrix::{Matrix, MatrixMut, MatrixRef};
pub use memory::MemoryBlock;
pub use sliding::{SlidingWindow, WindowConfig};

pub use matrix_traits::{BlasFloat, MatrixScalar};

/// Whether coordinate bounds are validated on element access.
///
/// Debug builds always check. Release builds check unless the `unchecked`
/// feature is enabled.
pub const CHECK_BOUNDS: bool = cfg!(any(debug_assertions, not(feature = "unchecked")));

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during matrix operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StridedError {
    /// Operand shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Operand ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// A coordinate lies outside the declared extent of its axis.
    #[error("index {index} out of range for axis {axis} with size {size}")]
    OutOfRange {
        axis: usize,
        index: usize,
        size: usize,
    },

    /// The requested shape cannot be produced from the source layout.
    #[error("incompatible shape: cannot rewrap {from:?} as {to:?}")]
    IncompatibleShape { from: Vec<usize>, to: Vec<usize> },

    /// The operation is not defined for this input.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// The element buffer could not be allocated.
    #[error("failed to allocate {0} elements")]
    AllocationFailure(usize),

    /// Invalid axis index for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Zero stride on a dimension with more than one element.
    #[error("invalid stride 0 for dim {dim}")]
    ZeroStride { dim: usize },

    /// Two coordinate tuples map to the same buffer position.
    #[error("strides {0:?} make distinct elements overlap")]
    OverlappingStrides(Vec<isize>),

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Integer overflow or a position outside the buffer.
    #[error("offset overflow while computing position")]
    OffsetOverflow,

    /// The shared buffer is locked by another guard.
    #[error("memory block is locked")]
    BufferLocked,

    /// The host copy is stale and must be synchronized from the device first.
    #[error("memory block is stale on the host; synchronize from device first")]
    DeviceStale,

    /// Sliding window configuration that would leave the parent extents.
    #[error("invalid sliding window: {0}")]
    InvalidWindow(String),
}

/// Result type for matrix operations.
pub type Result<T> = std::result::Result<T, StridedError>;
