//! The strided matrix type: construction, shape queries, views and element access.

use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::iter::{ColIter, ColIterMut, ColMajor, Cursor, Iter, IterMut, RowIter, RowIterMut};
use crate::iter::{RowMajor, TraversalOrder};
use crate::layout::{
    canonical_strides, checked_total, is_canonical, is_contiguous, last_raw_pos,
    strides_overlap, validate_bounds, MajorOrder,
};
use crate::memory::MemoryBlock;
use crate::order::stride_order;
use crate::{Result, StridedError, CHECK_BOUNDS};

/// N-dimensional strided view over a shared [`MemoryBlock`].
///
/// Views (sub-matrices, transposes, rewraps, shallow copies) share the block;
/// element writes through any of them are visible through all others. The
/// block lives as long as its longest holder.
///
/// `Matrix` does not implement `Clone`: use
/// [`shallow_copy`](Self::shallow_copy) for another view of the same data or
/// [`deep_clone`](Self::deep_clone) for an independent contiguous copy.
pub struct Matrix<T> {
    pub(crate) block: Arc<MemoryBlock<T>>,
    pub(crate) dims: Arc<[usize]>,
    pub(crate) strides: Arc<[isize]>,
    pub(crate) offset: usize,
    pub(crate) total_size: usize,
    pub(crate) last_raw_pos: usize,
    pub(crate) order: MajorOrder,
    use_device: bool,
}

impl<T> std::fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("dims", &self.dims)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .finish()
    }
}

impl<T> Matrix<T> {
    fn assemble(
        block: Arc<MemoryBlock<T>>,
        offset: usize,
        dims: Vec<usize>,
        strides: Vec<isize>,
        order: MajorOrder,
    ) -> Self {
        let total_size = dims.iter().product();
        let last = last_raw_pos(&dims, &strides, offset);
        Self {
            block,
            dims: dims.into(),
            strides: strides.into(),
            offset,
            total_size,
            last_raw_pos: last,
            order,
            use_device: false,
        }
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// Take ownership of `data`, laid out canonically for `order`.
    pub fn from_vec(dims: &[usize], order: MajorOrder, data: Vec<T>) -> Result<Self> {
        check_rank(dims)?;
        let total = checked_total(dims)?;
        if total != data.len() {
            return Err(StridedError::ShapeMismatch(vec![data.len()], dims.to_vec()));
        }
        Self::view(Arc::new(MemoryBlock::from_vec(data)), 0, dims, order)
    }

    /// Canonical-stride view of an existing block starting at `offset`.
    pub fn view(
        block: Arc<MemoryBlock<T>>,
        offset: usize,
        dims: &[usize],
        order: MajorOrder,
    ) -> Result<Self> {
        check_rank(dims)?;
        let strides = canonical_strides(dims, order);
        validate_bounds(block.len(), dims, &strides, offset)?;
        Ok(Self::assemble(block, offset, dims.to_vec(), strides, order))
    }

    /// View of an existing block with explicit strides.
    ///
    /// Strides may be negative or permuted, but no two coordinate tuples may
    /// address the same element. The major order tag is `ColMajor` when the
    /// strides are canonical column-major (and not row-major), else `RowMajor`.
    pub fn from_parts(
        block: Arc<MemoryBlock<T>>,
        offset: usize,
        dims: &[usize],
        strides: &[isize],
    ) -> Result<Self> {
        check_rank(dims)?;
        checked_total(dims)?;
        validate_bounds(block.len(), dims, strides, offset)?;
        if strides_overlap(dims, strides) {
            return Err(StridedError::OverlappingStrides(strides.to_vec()));
        }
        let order = if is_canonical(dims, strides, MajorOrder::ColMajor)
            && !is_canonical(dims, strides, MajorOrder::RowMajor)
        {
            MajorOrder::ColMajor
        } else {
            MajorOrder::RowMajor
        };
        Ok(Self::assemble(
            block,
            offset,
            dims.to_vec(),
            strides.to_vec(),
            order,
        ))
    }

    /// New view of this block; inherits the device hint.
    fn derive(
        &self,
        offset: usize,
        dims: Vec<usize>,
        strides: Vec<isize>,
        order: MajorOrder,
    ) -> Self {
        let mut view = Self::assemble(Arc::clone(&self.block), offset, dims, strides, order);
        view.use_device = self.use_device;
        view
    }

    /// Same block and offset with replaced shape metadata. Callers keep the
    /// new strides inside the view's footprint.
    pub(crate) fn with_shape(&self, dims: Vec<usize>, strides: Vec<isize>) -> Self {
        self.derive(self.offset, dims, strides, self.order)
    }

    /// Another view of the same data with the same shape.
    pub fn shallow_copy(&self) -> Self {
        Self {
            block: Arc::clone(&self.block),
            dims: Arc::clone(&self.dims),
            strides: Arc::clone(&self.strides),
            offset: self.offset,
            total_size: self.total_size,
            last_raw_pos: self.last_raw_pos,
            order: self.order,
            use_device: self.use_device,
        }
    }

    // ========================================================================
    // Shape queries
    // ========================================================================

    #[inline]
    pub fn num_dim(&self) -> usize {
        self.dims.len()
    }

    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim_size(&self, axis: usize) -> Result<usize> {
        self.dims.get(axis).copied().ok_or(StridedError::InvalidAxis {
            axis,
            rank: self.num_dim(),
        })
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn stride_size(&self, axis: usize) -> Result<isize> {
        self.strides
            .get(axis)
            .copied()
            .ok_or(StridedError::InvalidAxis {
                axis,
                rank: self.num_dim(),
            })
    }

    /// Total number of logical elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.total_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }

    #[inline]
    pub fn major_order(&self) -> MajorOrder {
        self.order
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Raw position of the last logical element.
    #[inline]
    pub fn last_raw_pos(&self) -> usize {
        self.last_raw_pos
    }

    /// True if some axis ordering makes the strides gap-free and packed.
    pub fn is_contiguous(&self) -> bool {
        is_contiguous(&self.dims, &self.strides)
    }

    /// Contiguous in row-major canonical order.
    pub fn is_simple(&self) -> bool {
        self.order == MajorOrder::RowMajor
            && is_canonical(&self.dims, &self.strides, MajorOrder::RowMajor)
    }

    /// At most one axis has extent greater than one.
    pub fn is_vector(&self) -> bool {
        self.dims.iter().filter(|&&d| d > 1).count() <= 1
    }

    /// A rank-2 matrix with a single column.
    pub fn is_col_vector(&self) -> bool {
        self.num_dim() == 2 && self.dims[1] == 1
    }

    /// Element count of a vector-shaped matrix.
    pub fn vector_size(&self) -> usize {
        self.total_size
    }

    /// Stride along the non-singleton axis (the last axis if all are singleton).
    pub fn vector_stride(&self) -> isize {
        self.dims
            .iter()
            .position(|&d| d > 1)
            .map_or(self.strides[self.num_dim() - 1], |axis| self.strides[axis])
    }

    pub fn same_dim(&self, other: &Matrix<T>) -> bool {
        self.dims == other.dims
    }

    /// The shared buffer, for serializers and device collaborators.
    pub fn raw_data(&self) -> &Arc<MemoryBlock<T>> {
        &self.block
    }

    /// True if both matrices view the same buffer.
    pub fn shares_block(&self, other: &Matrix<T>) -> bool {
        Arc::ptr_eq(&self.block, &other.block)
    }

    pub(crate) fn block_id(&self) -> usize {
        Arc::as_ptr(&self.block) as *const () as usize
    }

    /// Routing hint for a device collaborator: whether it should run numeric
    /// work for this matrix. No operation in this crate reads it; views and
    /// clones inherit it. Host-side staleness is enforced by the
    /// [`MemoryBlock`] flag instead.
    #[inline]
    pub fn use_device(&self) -> bool {
        self.use_device
    }

    pub fn set_use_device(&mut self, use_device: bool) {
        self.use_device = use_device;
    }

    // ========================================================================
    // Positions and coordinates
    // ========================================================================

    /// Raw buffer position of `coords`, always bounds-checked.
    pub(crate) fn checked_raw_pos(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.num_dim() {
            return Err(StridedError::RankMismatch(coords.len(), self.num_dim()));
        }
        for (axis, (&c, &d)) in coords.iter().zip(self.dims.iter()).enumerate() {
            if c >= d {
                return Err(StridedError::OutOfRange {
                    axis,
                    index: c,
                    size: d,
                });
            }
        }
        Ok(self.raw_pos_unchecked(coords))
    }

    #[inline]
    fn raw_pos_unchecked(&self, coords: &[usize]) -> usize {
        let mut pos = self.offset as isize;
        for (&c, &s) in coords.iter().zip(self.strides.iter()) {
            pos += c as isize * s;
        }
        pos as usize
    }

    /// Raw buffer position of `coords`: `offset + sum(coords[i] * stride[i])`.
    ///
    /// Coordinates are validated unless bounds checks are compiled out (see
    /// [`CHECK_BOUNDS`]); the rank is always validated.
    pub fn raw_pos(&self, coords: &[usize]) -> Result<usize> {
        if CHECK_BOUNDS {
            return self.checked_raw_pos(coords);
        }
        if coords.len() != self.num_dim() {
            return Err(StridedError::RankMismatch(coords.len(), self.num_dim()));
        }
        Ok(self.raw_pos_unchecked(coords))
    }

    /// Coordinates of the element stored at `raw`.
    pub fn compute_coords(&self, raw: usize) -> Result<Vec<usize>> {
        let not_in_view = || StridedError::OutOfRange {
            axis: 0,
            index: raw,
            size: self.last_raw_pos + 1,
        };
        if self.total_size == 0 {
            return Err(not_in_view());
        }
        // Reflect negative-stride axes so every step is positive from the
        // lowest addressed element.
        let mut base = self.offset as isize;
        for (&d, &s) in self.dims.iter().zip(self.strides.iter()) {
            if s < 0 {
                base += s * (d as isize - 1);
            }
        }
        let mut rest = raw as isize - base;
        if rest < 0 {
            return Err(not_in_view());
        }
        let mut coords = vec![0; self.num_dim()];
        for axis in stride_order(&self.dims, &self.strides).into_iter().rev() {
            let step = self.strides[axis].abs();
            let c = ((rest / step) as usize).min(self.dims[axis] - 1);
            rest -= c as isize * step;
            coords[axis] = if self.strides[axis] < 0 {
                self.dims[axis] - 1 - c
            } else {
                c
            };
        }
        if rest != 0 {
            return Err(not_in_view());
        }
        Ok(coords)
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Same buffer and offset under a new shape.
    ///
    /// Requires canonical strides for the matrix's own major order, so the
    /// flattened element order is preserved.
    pub fn rewrap(&self, new_dims: &[usize]) -> Result<Self> {
        check_rank(new_dims)?;
        let incompatible = || StridedError::IncompatibleShape {
            from: self.dims.to_vec(),
            to: new_dims.to_vec(),
        };
        if checked_total(new_dims).map_err(|_| incompatible())? != self.total_size {
            return Err(incompatible());
        }
        if !is_canonical(&self.dims, &self.strides, self.order) {
            return Err(incompatible());
        }
        if self.block.needs_host_sync() {
            return Err(StridedError::DeviceStale);
        }
        let strides = canonical_strides(new_dims, self.order);
        Ok(self.derive(self.offset, new_dims.to_vec(), strides, self.order))
    }

    /// Swap the axes of a rank-2 view. Rank 1 yields a shallow copy.
    pub fn transpose(&self) -> Result<Self> {
        match self.num_dim() {
            1 => Ok(self.shallow_copy()),
            2 => Ok(self.derive(
                self.offset,
                vec![self.dims[1], self.dims[0]],
                vec![self.strides[1], self.strides[0]],
                self.order.flipped(),
            )),
            _ => Err(StridedError::Unsupported(
                "transpose is defined for rank 1 and 2 only",
            )),
        }
    }

    fn sub_view_shallow(&self, coords: &[usize], sizes: &[usize]) -> Result<Self> {
        if coords.len() != self.num_dim() {
            return Err(StridedError::RankMismatch(coords.len(), self.num_dim()));
        }
        if sizes.len() != self.num_dim() {
            return Err(StridedError::RankMismatch(sizes.len(), self.num_dim()));
        }
        for axis in 0..self.num_dim() {
            let (c, s, d) = (coords[axis], sizes[axis], self.dims[axis]);
            if c >= d || c + s > d {
                return Err(StridedError::OutOfRange {
                    axis,
                    index: c + s.saturating_sub(1),
                    size: d,
                });
            }
        }
        let offset = self.raw_pos_unchecked(coords);
        Ok(self.derive(offset, sizes.to_vec(), self.strides.to_vec(), self.order))
    }

    // ========================================================================
    // Cursors and guards
    // ========================================================================

    /// Cursor at the first element in traversal order `O`.
    pub fn begin<O: TraversalOrder>(&self) -> Cursor<O> {
        Cursor::begin(self)
    }

    /// The end cursor in traversal order `O`.
    pub fn end<O: TraversalOrder>(&self) -> Cursor<O> {
        Cursor::end(self)
    }

    /// Cursor starting at `coords`.
    pub fn iterator_at<O: TraversalOrder>(&self, coords: &[usize]) -> Result<Cursor<O>> {
        Cursor::at(self, coords)
    }

    /// Lock the buffer for reading.
    pub fn read(&self) -> Result<MatrixRef<'_, T>> {
        Ok(MatrixRef {
            matrix: self,
            guard: self.block.read()?,
        })
    }

    /// Lock the buffer for writing.
    pub fn write(&self) -> Result<MatrixMut<'_, T>> {
        Ok(MatrixMut {
            matrix: self,
            guard: self.block.write()?,
        })
    }
}

impl<T: Clone> Matrix<T> {
    /// Element at `coords`.
    pub fn get(&self, coords: &[usize]) -> Result<T> {
        let pos = self.raw_pos(coords)?;
        Ok(self.block.read()?[pos].clone())
    }

    /// Overwrite the element at `coords`.
    pub fn set(&self, coords: &[usize], value: T) -> Result<()> {
        let pos = self.raw_pos(coords)?;
        self.block.write()?[pos] = value;
        Ok(())
    }

    /// Logical elements in row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let guard = self.block.read()?;
        Ok(Cursor::<RowMajor>::begin(self)
            .map(|pos| guard[pos].clone())
            .collect())
    }

    /// Independent contiguous copy with the same major order.
    pub fn deep_clone(&self) -> Result<Self> {
        self.deep_clone_as(self.order)
    }

    /// Independent contiguous copy laid out in `order`.
    pub fn deep_clone_as(&self, order: MajorOrder) -> Result<Self> {
        let data: Vec<T> = {
            let guard = self.block.read()?;
            match order {
                MajorOrder::RowMajor => Cursor::<RowMajor>::begin(self)
                    .map(|pos| guard[pos].clone())
                    .collect(),
                MajorOrder::ColMajor => Cursor::<ColMajor>::begin(self)
                    .map(|pos| guard[pos].clone())
                    .collect(),
            }
        };
        log::trace!("deep clone of {:?} into {:?} order", self.dims, order);
        let mut copy = Self::from_vec(&self.dims, order, data)?;
        copy.use_device = self.use_device;
        Ok(copy)
    }

    /// A view of `src` (`deep == false`) or an independent copy of it.
    pub fn from_matrix(src: &Matrix<T>, deep: bool) -> Result<Self> {
        if deep {
            src.deep_clone()
        } else {
            Ok(src.shallow_copy())
        }
    }

    /// Sub-matrix of extent `sizes` whose first element is at `coords`.
    ///
    /// The shallow form keeps the parent's strides and aliases its data; the
    /// deep form is an independent contiguous copy.
    pub fn sub_view(&self, coords: &[usize], sizes: &[usize], deep: bool) -> Result<Self> {
        let view = self.sub_view_shallow(coords, sizes)?;
        if deep {
            view.deep_clone()
        } else {
            Ok(view)
        }
    }
}

impl<T: Clone + Default> Matrix<T> {
    /// Allocate a fresh default-filled matrix.
    pub fn from_shape(dims: &[usize], order: MajorOrder) -> Result<Self> {
        check_rank(dims)?;
        let total = checked_total(dims)?;
        let block = MemoryBlock::allocate(total)?;
        Self::view(Arc::new(block), 0, dims, order)
    }

    /// Fresh default-filled matrix with this shape and major order.
    pub fn clone_only_dims(&self) -> Result<Self> {
        Self::from_shape(&self.dims, self.order)
    }
}

fn check_rank(dims: &[usize]) -> Result<()> {
    if dims.is_empty() {
        return Err(StridedError::Unsupported("matrix rank must be at least 1"));
    }
    Ok(())
}

// ============================================================================
// Lock guards
// ============================================================================

/// Read-locked matrix: coordinate access and const iteration.
pub struct MatrixRef<'a, T> {
    matrix: &'a Matrix<T>,
    guard: RwLockReadGuard<'a, Vec<T>>,
}

impl<'a, T> MatrixRef<'a, T> {
    pub fn at(&self, coords: &[usize]) -> Result<&T> {
        let pos = self.matrix.raw_pos(coords)?;
        Ok(&self.guard[pos])
    }

    /// Row-major iterator.
    pub fn iter(&self) -> RowIter<'_, T> {
        Iter::new(self.guard.as_slice(), Cursor::begin(self.matrix))
    }

    /// Column-major iterator.
    pub fn iter_col_major(&self) -> ColIter<'_, T> {
        Iter::new(self.guard.as_slice(), Cursor::begin(self.matrix))
    }

    /// Whole underlying buffer (not just this view).
    pub fn buffer(&self) -> &[T] {
        self.guard.as_slice()
    }
}

/// Write-locked matrix: mutable coordinate access and iteration.
pub struct MatrixMut<'a, T> {
    matrix: &'a Matrix<T>,
    guard: RwLockWriteGuard<'a, Vec<T>>,
}

impl<'a, T> MatrixMut<'a, T> {
    pub fn at(&self, coords: &[usize]) -> Result<&T> {
        let pos = self.matrix.raw_pos(coords)?;
        Ok(&self.guard[pos])
    }

    pub fn at_mut(&mut self, coords: &[usize]) -> Result<&mut T> {
        let pos = self.matrix.raw_pos(coords)?;
        Ok(&mut self.guard[pos])
    }

    pub fn iter(&self) -> RowIter<'_, T> {
        Iter::new(self.guard.as_slice(), Cursor::begin(self.matrix))
    }

    pub fn iter_col_major(&self) -> ColIter<'_, T> {
        Iter::new(self.guard.as_slice(), Cursor::begin(self.matrix))
    }

    /// Row-major mutable iterator.
    pub fn iter_mut(&mut self) -> RowIterMut<'_, T> {
        IterMut::new(self.guard.as_mut_slice(), Cursor::begin(self.matrix))
    }

    /// Column-major mutable iterator.
    pub fn iter_col_major_mut(&mut self) -> ColIterMut<'_, T> {
        IterMut::new(self.guard.as_mut_slice(), Cursor::<ColMajor>::begin(self.matrix))
    }

    pub fn buffer_mut(&mut self) -> &mut [T] {
        self.guard.as_mut_slice()
    }
}
