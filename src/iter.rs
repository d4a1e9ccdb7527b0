//! Traversal cursors over strided matrices.
//!
//! One generic [`Cursor`] walks raw buffer positions in logical order. The
//! traversal order is a type parameter ([`RowMajor`]: last axis fastest,
//! [`ColMajor`]: first axis fastest). [`Iter`] and [`IterMut`] pair a cursor
//! with a locked buffer to yield element references, giving the four
//! mutable/const x row/column-major iterator kinds from one implementation.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::layout::{is_canonical, is_contiguous, MajorOrder};
use crate::matrix::Matrix;
use crate::order::best_span_order;
use crate::Result;

// ============================================================================
// Traversal order policy
// ============================================================================

/// Policy selecting which axis varies fastest during traversal.
pub trait TraversalOrder: Copy + Default + std::fmt::Debug + 'static {
    /// The major order whose canonical strides make this traversal a flat walk.
    const MAJOR: MajorOrder;

    /// Axis that varies `k`-th fastest in a rank-`rank` traversal.
    fn axis(rank: usize, k: usize) -> usize;
}

/// Last axis varies fastest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowMajor;

/// First axis varies fastest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColMajor;

impl TraversalOrder for RowMajor {
    const MAJOR: MajorOrder = MajorOrder::RowMajor;

    #[inline]
    fn axis(rank: usize, k: usize) -> usize {
        rank - 1 - k
    }
}

impl TraversalOrder for ColMajor {
    const MAJOR: MajorOrder = MajorOrder::ColMajor;

    #[inline]
    fn axis(_rank: usize, k: usize) -> usize {
        k
    }
}

// ============================================================================
// Cursor
// ============================================================================

/// Position walker over a matrix in the logical order selected by `O`.
///
/// As an [`Iterator`] it yields raw buffer positions. The end cursor sits at
/// "one past the last raw position"; advancing past the end is a no-op.
/// Equality compares the shared buffer, the raw position and end state.
#[derive(Debug, Clone)]
pub struct Cursor<O: TraversalOrder> {
    parent: usize,
    dims: Arc<[usize]>,
    strides: Arc<[isize]>,
    // Only maintained on the strided path
    coords: Vec<usize>,
    raw: usize,
    index: usize,
    total: usize,
    end_raw: usize,
    flat: bool,
    _order: PhantomData<O>,
}

impl<O: TraversalOrder> Cursor<O> {
    /// Cursor at the first logical element (or the end, if the matrix is empty).
    pub fn begin<T>(m: &Matrix<T>) -> Self {
        let mut cursor = Self {
            parent: m.block_id(),
            dims: Arc::clone(&m.dims),
            strides: Arc::clone(&m.strides),
            coords: vec![0; m.dims.len()],
            raw: m.offset,
            index: 0,
            total: m.total_size,
            end_raw: m.last_raw_pos + 1,
            flat: is_canonical(&m.dims, &m.strides, O::MAJOR),
            _order: PhantomData,
        };
        if cursor.total == 0 {
            cursor.raw = cursor.end_raw;
        }
        cursor
    }

    /// The canonical end cursor.
    pub fn end<T>(m: &Matrix<T>) -> Self {
        let mut cursor = Self::begin(m);
        cursor.index = cursor.total;
        cursor.raw = cursor.end_raw;
        cursor
    }

    /// Cursor positioned at `coords`.
    pub fn at<T>(m: &Matrix<T>, coords: &[usize]) -> Result<Self> {
        let raw = m.checked_raw_pos(coords)?;
        let rank = coords.len();
        let mut index = 0;
        for k in (0..rank).rev() {
            let axis = O::axis(rank, k);
            index = index * m.dims[axis] + coords[axis];
        }
        let mut cursor = Self::begin(m);
        cursor.coords.copy_from_slice(coords);
        cursor.raw = raw;
        cursor.index = index;
        Ok(cursor)
    }

    /// Raw buffer position of the current element.
    #[inline]
    pub fn raw_pos(&self) -> usize {
        self.raw
    }

    /// Logical index of the current element in traversal order.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.index >= self.total
    }

    /// Coordinates of the current element, `None` at the end.
    pub fn coords(&self) -> Option<Vec<usize>> {
        if self.is_end() {
            return None;
        }
        if !self.flat {
            return Some(self.coords.clone());
        }
        let rank = self.dims.len();
        let mut coords = vec![0; rank];
        let mut rest = self.index;
        for k in 0..rank {
            let axis = O::axis(rank, k);
            coords[axis] = rest % self.dims[axis];
            rest /= self.dims[axis];
        }
        Some(coords)
    }

    /// Move to the next logical element.
    pub fn advance(&mut self) {
        if self.is_end() {
            return;
        }
        self.index += 1;
        if self.index == self.total {
            self.raw = self.end_raw;
            return;
        }
        if self.flat {
            self.raw += 1;
            return;
        }
        let rank = self.dims.len();
        let mut raw = self.raw as isize;
        for k in 0..rank {
            let axis = O::axis(rank, k);
            self.coords[axis] += 1;
            if self.coords[axis] < self.dims[axis] {
                raw += self.strides[axis];
                break;
            }
            raw -= self.strides[axis] * (self.dims[axis] as isize - 1);
            self.coords[axis] = 0;
        }
        self.raw = raw as usize;
    }
}

impl<O: TraversalOrder> PartialEq for Cursor<O> {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent && self.raw == other.raw && self.is_end() == other.is_end()
    }
}

impl<O: TraversalOrder> Eq for Cursor<O> {}

impl<O: TraversalOrder> Iterator for Cursor<O> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.is_end() {
            return None;
        }
        let pos = self.raw;
        self.advance();
        Some(pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.total - self.index.min(self.total);
        (n, Some(n))
    }
}

impl<O: TraversalOrder> ExactSizeIterator for Cursor<O> {}

// ============================================================================
// Element iterators
// ============================================================================

/// Shared-reference iterator over the elements of a locked matrix.
pub struct Iter<'a, T, O: TraversalOrder> {
    data: &'a [T],
    cursor: Cursor<O>,
}

/// Row-major const iterator.
pub type RowIter<'a, T> = Iter<'a, T, RowMajor>;
/// Column-major const iterator.
pub type ColIter<'a, T> = Iter<'a, T, ColMajor>;

impl<'a, T, O: TraversalOrder> Iter<'a, T, O> {
    pub(crate) fn new(data: &'a [T], cursor: Cursor<O>) -> Self {
        Self { data, cursor }
    }

    /// The underlying position cursor.
    pub fn cursor(&self) -> &Cursor<O> {
        &self.cursor
    }
}

impl<'a, T, O: TraversalOrder> Iterator for Iter<'a, T, O> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.cursor.next().map(|pos| &self.data[pos])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl<T, O: TraversalOrder> ExactSizeIterator for Iter<'_, T, O> {}

/// Mutable iterator over the elements of a write-locked matrix.
pub struct IterMut<'a, T, O: TraversalOrder> {
    ptr: *mut T,
    len: usize,
    cursor: Cursor<O>,
    _marker: PhantomData<&'a mut T>,
}

/// Row-major mutable iterator.
pub type RowIterMut<'a, T> = IterMut<'a, T, RowMajor>;
/// Column-major mutable iterator.
pub type ColIterMut<'a, T> = IterMut<'a, T, ColMajor>;

// SAFETY: IterMut hands out disjoint `&mut T`, like `std::slice::IterMut`.
unsafe impl<T: Send, O: TraversalOrder> Send for IterMut<'_, T, O> {}
unsafe impl<T: Sync, O: TraversalOrder> Sync for IterMut<'_, T, O> {}

impl<'a, T, O: TraversalOrder> IterMut<'a, T, O> {
    pub(crate) fn new(data: &'a mut [T], cursor: Cursor<O>) -> Self {
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            cursor,
            _marker: PhantomData,
        }
    }

    pub fn cursor(&self) -> &Cursor<O> {
        &self.cursor
    }
}

impl<'a, T, O: TraversalOrder> Iterator for IterMut<'a, T, O> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        let pos = self.cursor.next()?;
        assert!(pos < self.len, "cursor position {pos} outside buffer");
        // SAFETY: matrices never carry overlapping strides, so the cursor
        // yields each position at most once and no two references alias.
        Some(unsafe { &mut *self.ptr.add(pos) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

impl<T, O: TraversalOrder> ExactSizeIterator for IterMut<'_, T, O> {}

// ============================================================================
// Best-span traversal (crate-private)
// ============================================================================

/// A run of equally spaced positions along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub stride: isize,
    pub len: usize,
}

impl Span {
    #[inline]
    pub fn positions(self) -> impl Iterator<Item = usize> {
        let start = self.start as isize;
        (0..self.len).map(move |i| (start + i as isize * self.stride) as usize)
    }
}

/// Walks a matrix as spans along its longest axis.
///
/// Visits every element exactly once, but not in logical order; only
/// order-insensitive operations (maps, fills, sums) use it. A contiguous
/// matrix collapses to a single unit-stride span.
#[derive(Debug, Clone)]
pub(crate) struct BestSpan {
    dims: Vec<usize>,
    strides: Vec<isize>,
    outer: Vec<usize>,
    coords: Vec<usize>,
    span_stride: isize,
    span_len: usize,
    raw: isize,
    remaining: usize,
}

impl BestSpan {
    pub fn new<T>(m: &Matrix<T>) -> Self {
        let dims = m.dims.to_vec();
        let strides = m.strides.to_vec();
        let (span_stride, span_len, outer) = if m.total_size == 0 {
            (1, 0, Vec::new())
        } else if is_contiguous(&dims, &strides) {
            (1, m.total_size, Vec::new())
        } else {
            let order = best_span_order(&dims);
            (strides[order[0]], dims[order[0]], order[1..].to_vec())
        };
        let remaining = if span_len == 0 {
            0
        } else {
            m.total_size / span_len
        };
        Self {
            coords: vec![0; outer.len()],
            dims,
            strides,
            outer,
            span_stride,
            span_len,
            raw: m.offset as isize,
            remaining,
        }
    }
}

impl Iterator for BestSpan {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        if self.remaining == 0 {
            return None;
        }
        let span = Span {
            start: self.raw as usize,
            stride: self.span_stride,
            len: self.span_len,
        };
        self.remaining -= 1;
        if self.remaining > 0 {
            for (k, &axis) in self.outer.iter().enumerate() {
                self.coords[k] += 1;
                if self.coords[k] < self.dims[axis] {
                    self.raw += self.strides[axis];
                    break;
                }
                self.raw -= self.strides[axis] * (self.dims[axis] as isize - 1);
                self.coords[k] = 0;
            }
        }
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arange(dims: &[usize], order: MajorOrder) -> Matrix<f64> {
        let n: usize = dims.iter().product();
        Matrix::from_vec(dims, order, (0..n).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn test_row_major_cursor_contiguous() {
        let m = arange(&[2, 3], MajorOrder::RowMajor);
        let positions: Vec<usize> = Cursor::<RowMajor>::begin(&m).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_col_major_cursor_on_row_major_data() {
        let m = arange(&[2, 3], MajorOrder::RowMajor);
        let positions: Vec<usize> = Cursor::<ColMajor>::begin(&m).collect();
        assert_eq!(positions, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn test_cursor_coords_strided_and_flat() {
        let m = arange(&[2, 3], MajorOrder::RowMajor);
        let mut flat = Cursor::<RowMajor>::begin(&m);
        let mut strided = Cursor::<ColMajor>::begin(&m);
        flat.advance();
        flat.advance();
        flat.advance();
        strided.advance();
        assert_eq!(flat.coords(), Some(vec![1, 0]));
        assert_eq!(strided.coords(), Some(vec![1, 0]));
    }

    #[test]
    fn test_cursor_end_is_sticky() {
        let m = arange(&[2, 2], MajorOrder::RowMajor);
        let mut c = Cursor::<RowMajor>::begin(&m);
        for _ in 0..10 {
            c.advance();
        }
        assert!(c.is_end());
        assert_eq!(c, Cursor::<RowMajor>::end(&m));
        assert_eq!(c.raw_pos(), 4);
        assert_eq!(c.coords(), None);
    }

    #[test]
    fn test_cursor_at_matches_advance() {
        let m = arange(&[3, 4], MajorOrder::RowMajor);
        let sub = m.sub_view(&[1, 1], &[2, 3], false).unwrap();
        let mut c = Cursor::<ColMajor>::begin(&sub);
        c.advance();
        c.advance();
        let at = Cursor::<ColMajor>::at(&sub, &[0, 1]).unwrap();
        assert_eq!(c, at);
        assert_eq!(at.index(), 2);
    }

    #[test]
    fn test_cursor_on_transposed_view() {
        let m = arange(&[2, 3], MajorOrder::RowMajor);
        let t = m.transpose().unwrap();
        let positions: Vec<usize> = Cursor::<RowMajor>::begin(&t).collect();
        assert_eq!(positions, vec![0, 3, 1, 4, 2, 5]);
        // Column-major traversal of the transpose is a flat walk
        let flat: Vec<usize> = Cursor::<ColMajor>::begin(&t).collect();
        assert_eq!(flat, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cursors_of_different_buffers_differ() {
        let a = arange(&[2], MajorOrder::RowMajor);
        let b = arange(&[2], MajorOrder::RowMajor);
        assert_ne!(Cursor::<RowMajor>::begin(&a), Cursor::<RowMajor>::begin(&b));
        let shallow = a.shallow_copy();
        assert_eq!(
            Cursor::<RowMajor>::begin(&a),
            Cursor::<RowMajor>::begin(&shallow)
        );
    }

    #[test]
    fn test_iter_mut_writes_in_order() {
        let m = Matrix::<f64>::from_shape(&[2, 2], MajorOrder::RowMajor).unwrap();
        {
            let mut w = m.write().unwrap();
            for (i, x) in w.iter_col_major_mut().enumerate() {
                *x = i as f64;
            }
        }
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_best_span_contiguous_single_span() {
        let m = arange(&[3, 4], MajorOrder::ColMajor);
        let spans: Vec<Span> = BestSpan::new(&m).collect();
        assert_eq!(
            spans,
            vec![Span {
                start: 0,
                stride: 1,
                len: 12
            }]
        );
    }

    #[test]
    fn test_best_span_strided_covers_all() {
        let m = arange(&[4, 6], MajorOrder::RowMajor);
        let sub = m.sub_view(&[1, 1], &[3, 2], false).unwrap();
        let spans: Vec<Span> = BestSpan::new(&sub).collect();
        // Longest axis (0, extent 3) is the span axis
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.len == 3 && s.stride == 6));
        let mut all: Vec<usize> = spans.into_iter().flat_map(Span::positions).collect();
        all.sort_unstable();
        assert_eq!(all, vec![7, 8, 13, 14, 19, 20]);
    }

    #[test]
    fn test_best_span_empty() {
        let m = Matrix::<f64>::from_shape(&[0, 3], MajorOrder::RowMajor).unwrap();
        assert_eq!(BestSpan::new(&m).count(), 0);
    }
}
