//! Shape and stride algebra shared by every matrix view.

use crate::order::stride_order;
use crate::{Result, StridedError};

/// Memory layout tag. Governs canonical stride computation and BLAS dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum MajorOrder {
    /// C order: last index varies fastest.
    #[default]
    RowMajor,
    /// Fortran order: first index varies fastest.
    ColMajor,
}

impl MajorOrder {
    /// The other order (layout of a transposed 2-D matrix).
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            MajorOrder::RowMajor => MajorOrder::ColMajor,
            MajorOrder::ColMajor => MajorOrder::RowMajor,
        }
    }
}

/// Compute column-major strides (first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1].max(1) as isize;
    }
    strides
}

/// Compute row-major strides (last index varies fastest).
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1].max(1) as isize;
    }
    strides
}

/// Canonical packed strides for `dims` in the given order.
pub fn canonical_strides(dims: &[usize], order: MajorOrder) -> Vec<isize> {
    match order {
        MajorOrder::RowMajor => row_major_strides(dims),
        MajorOrder::ColMajor => col_major_strides(dims),
    }
}

/// Product of `dims`, failing on overflow.
pub(crate) fn checked_total(dims: &[usize]) -> Result<usize> {
    dims.iter().try_fold(1usize, |acc, &d| {
        acc.checked_mul(d)
            .ok_or(StridedError::AllocationFailure(usize::MAX))
    })
}

/// True if `strides` equal the canonical strides for `order`, ignoring
/// singleton axes (their stride is never used).
pub(crate) fn is_canonical(dims: &[usize], strides: &[isize], order: MajorOrder) -> bool {
    let expected = canonical_strides(dims, order);
    dims.iter()
        .zip(strides.iter().zip(expected.iter()))
        .all(|(&d, (&s, &e))| d <= 1 || s == e)
}

/// True if some ordering of the axes makes `strides` a gap-free packed layout.
pub(crate) fn is_contiguous(dims: &[usize], strides: &[isize]) -> bool {
    let mut expected = 1isize;
    for axis in stride_order(dims, strides) {
        if strides[axis] != expected {
            return false;
        }
        expected *= dims[axis] as isize;
    }
    true
}

/// True if two distinct coordinate tuples can map to the same position.
///
/// Sufficient check: walking axes by ascending stride magnitude, every stride
/// must exceed the furthest reach of all smaller axes combined.
pub(crate) fn strides_overlap(dims: &[usize], strides: &[isize]) -> bool {
    let mut reach = 0usize;
    for axis in stride_order(dims, strides) {
        let step = strides[axis].unsigned_abs();
        if step <= reach {
            return true;
        }
        reach += step * (dims[axis] - 1);
    }
    false
}

/// Validate that all accessed positions stay within `[0, len)`.
pub(crate) fn validate_bounds(
    len: usize,
    dims: &[usize],
    strides: &[isize],
    offset: usize,
) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    for (dim, (&d, &s)) in dims.iter().zip(strides.iter()).enumerate() {
        if d > 1 && s == 0 {
            return Err(StridedError::ZeroStride { dim });
        }
    }
    // Empty view - no access needed
    if dims.iter().any(|&d| d == 0) {
        return Ok(());
    }
    let offset = isize::try_from(offset).map_err(|_| StridedError::OffsetOverflow)?;
    let mut min_offset = offset;
    let mut max_offset = offset;
    for (&dim, &stride) in dims.iter().zip(strides.iter()) {
        if dim > 1 {
            let end = stride
                .checked_mul(dim as isize - 1)
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

/// Position of the last logical element (all coordinates at their maximum).
pub(crate) fn last_raw_pos(dims: &[usize], strides: &[isize], offset: usize) -> usize {
    let mut pos = offset as isize;
    for (&d, &s) in dims.iter().zip(strides.iter()) {
        if d > 0 {
            pos += (d as isize - 1) * s;
        }
    }
    pos as usize
}
