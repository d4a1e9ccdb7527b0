//! BLAS integration for matrix-vector and matrix-matrix kernels.
//!
//! This module decides whether a matrix's stride pattern can be handed to
//! CBLAS, and (with the `blas` feature) performs the calls. Every operand of
//! a call must be eligible; otherwise callers run the generic iterator path.

use crate::layout::is_contiguous;
use crate::matrix::Matrix;
use crate::BlasFloat;

/// BLAS matrix layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlasLayout {
    /// Row-major (C-style): rows are contiguous, stride[1] == 1
    RowMajor,
    /// Column-major (Fortran-style): columns are contiguous, stride[0] == 1
    ColMajor,
}

/// Information about a BLAS-compatible matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlasMatrix {
    pub layout: BlasLayout,
    pub rows: usize,
    pub cols: usize,
    pub ld: usize, // leading dimension
    pub offset: usize,
}

/// Information about a BLAS-compatible vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlasVector {
    pub offset: usize,
    pub len: usize,
    pub inc: usize,
}

/// True when CBLAS may be called for element type `T` in this build.
#[inline]
pub fn blas_enabled<T: BlasFloat>() -> bool {
    cfg!(feature = "blas") && T::has_blas()
}

#[inline]
fn fits_blas_int(n: usize) -> bool {
    n <= i32::MAX as usize
}

/// Check if a rank-2 matrix is compatible with BLAS operations.
///
/// A matrix is BLAS-compatible if either:
/// - Row-major: stride[1] == 1 and stride[0] >= cols
/// - Column-major: stride[0] == 1 and stride[1] >= rows
///
/// The stride of a singleton axis is never used, so it is not checked.
pub fn is_blas_matrix<T>(m: &Matrix<T>) -> Option<BlasMatrix> {
    if m.num_dim() != 2 {
        return None;
    }
    let (rows, cols) = (m.dims()[0], m.dims()[1]);
    let (rs, cs) = (m.strides()[0], m.strides()[1]);
    if !fits_blas_int(rows) || !fits_blas_int(cols) {
        return None;
    }

    // Check for row-major layout (stride[1] == 1)
    if cols <= 1 || cs == 1 {
        let ld = if rows <= 1 { cols.max(1) as isize } else { rs };
        if ld >= cols.max(1) as isize && fits_blas_int(ld as usize) {
            return Some(BlasMatrix {
                layout: BlasLayout::RowMajor,
                rows,
                cols,
                ld: ld as usize,
                offset: m.offset(),
            });
        }
    }

    // Check for column-major layout (stride[0] == 1)
    if rows <= 1 || rs == 1 {
        let ld = if cols <= 1 { rows.max(1) as isize } else { cs };
        if ld >= rows.max(1) as isize && fits_blas_int(ld as usize) {
            return Some(BlasMatrix {
                layout: BlasLayout::ColMajor,
                rows,
                cols,
                ld: ld as usize,
                offset: m.offset(),
            });
        }
    }

    None
}

/// Check if a vector-shaped matrix has a BLAS increment (positive stride).
pub fn is_blas_vector<T>(m: &Matrix<T>) -> Option<BlasVector> {
    if !m.is_vector() || !fits_blas_int(m.size()) {
        return None;
    }
    let inc = if m.size() <= 1 { 1 } else { m.vector_stride() };
    if inc <= 0 || !fits_blas_int(inc as usize) {
        return None;
    }
    Some(BlasVector {
        offset: m.offset(),
        len: m.size(),
        inc: inc as usize,
    })
}

/// View a vector or a contiguous matrix as one flat BLAS vector.
pub fn flat_vector<T>(m: &Matrix<T>) -> Option<BlasVector> {
    if let Some(v) = is_blas_vector(m) {
        return Some(v);
    }
    if is_contiguous(m.dims(), m.strides()) && fits_blas_int(m.size()) {
        return Some(BlasVector {
            offset: m.offset(),
            len: m.size(),
            inc: 1,
        });
    }
    None
}

/// Flat BLAS vectors for an element-aligned operand pair.
///
/// Two vectors of equal length always pair up. Two contiguous matrices pair up
/// only with identical shape and strides, so flat and logical order agree.
pub fn flat_pair<T>(x: &Matrix<T>, y: &Matrix<T>) -> Option<(BlasVector, BlasVector)> {
    if x.size() != y.size() {
        return None;
    }
    if x.is_vector() && y.is_vector() {
        return Some((is_blas_vector(x)?, is_blas_vector(y)?));
    }
    if x.dims() == y.dims() && x.strides() == y.strides() {
        return Some((flat_vector(x)?, flat_vector(y)?));
    }
    None
}

// ============================================================================
// BLAS-backed operations (feature-gated)
// ============================================================================

#[cfg(feature = "blas")]
pub(crate) mod blas_impl {
    use super::*;
    use cblas::{Layout, Transpose};

    // SAFETY (all casts below): `BlasFloat` guarantees `T` is exactly f64
    // when `is_double()` holds and exactly f32 when `is_single()` holds.
    unsafe fn cast<T, U>(x: &[T]) -> &[U] {
        std::slice::from_raw_parts(x.as_ptr() as *const U, x.len())
    }

    unsafe fn cast_mut<T, U>(x: &mut [T]) -> &mut [U] {
        std::slice::from_raw_parts_mut(x.as_mut_ptr() as *mut U, x.len())
    }

    fn layout_of(layout: BlasLayout) -> Layout {
        match layout {
            BlasLayout::RowMajor => Layout::RowMajor,
            BlasLayout::ColMajor => Layout::ColumnMajor,
        }
    }

    /// BLAS gemm: C = alpha * A * B + beta * C
    ///
    /// `a` is rows(C) x k and `b` is k x cols(C), each in its own layout;
    /// operands whose layout differs from C's are passed transposed.
    #[allow(clippy::too_many_arguments)]
    pub fn gemm<T: BlasFloat>(
        alpha: T,
        a: &[T],
        am: BlasMatrix,
        b: &[T],
        bm: BlasMatrix,
        beta: T,
        c: &mut [T],
        cm: BlasMatrix,
    ) {
        let layout = layout_of(cm.layout);
        let trans = |x: BlasMatrix| {
            if x.layout == cm.layout {
                Transpose::None
            } else {
                Transpose::Ordinary
            }
        };
        let (m, n, k) = (cm.rows as i32, cm.cols as i32, am.cols as i32);
        let (a, b, c) = (&a[am.offset..], &b[bm.offset..], &mut c[cm.offset..]);
        unsafe {
            if T::is_double() {
                cblas::dgemm(
                    layout,
                    trans(am),
                    trans(bm),
                    m,
                    n,
                    k,
                    std::mem::transmute_copy::<T, f64>(&alpha),
                    cast(a),
                    am.ld as i32,
                    cast(b),
                    bm.ld as i32,
                    std::mem::transmute_copy::<T, f64>(&beta),
                    cast_mut(c),
                    cm.ld as i32,
                );
            } else if T::is_single() {
                cblas::sgemm(
                    layout,
                    trans(am),
                    trans(bm),
                    m,
                    n,
                    k,
                    std::mem::transmute_copy::<T, f32>(&alpha),
                    cast(a),
                    am.ld as i32,
                    cast(b),
                    bm.ld as i32,
                    std::mem::transmute_copy::<T, f32>(&beta),
                    cast_mut(c),
                    cm.ld as i32,
                );
            }
        }
    }

    /// BLAS gemv: y = alpha * A * x + beta * y
    #[allow(clippy::too_many_arguments)]
    pub fn gemv<T: BlasFloat>(
        alpha: T,
        a: &[T],
        am: BlasMatrix,
        x: &[T],
        xv: BlasVector,
        beta: T,
        y: &mut [T],
        yv: BlasVector,
    ) {
        // CBLAS m, n describe the stored matrix, before the transpose flag
        let (trans, m, n) = match am.layout {
            BlasLayout::RowMajor => (Transpose::None, am.rows, am.cols),
            BlasLayout::ColMajor => (Transpose::Ordinary, am.cols, am.rows),
        };
        let (a, x, y) = (&a[am.offset..], &x[xv.offset..], &mut y[yv.offset..]);
        unsafe {
            if T::is_double() {
                cblas::dgemv(
                    Layout::RowMajor,
                    trans,
                    m as i32,
                    n as i32,
                    std::mem::transmute_copy::<T, f64>(&alpha),
                    cast(a),
                    am.ld as i32,
                    cast(x),
                    xv.inc as i32,
                    std::mem::transmute_copy::<T, f64>(&beta),
                    cast_mut(y),
                    yv.inc as i32,
                );
            } else if T::is_single() {
                cblas::sgemv(
                    Layout::RowMajor,
                    trans,
                    m as i32,
                    n as i32,
                    std::mem::transmute_copy::<T, f32>(&alpha),
                    cast(a),
                    am.ld as i32,
                    cast(x),
                    xv.inc as i32,
                    std::mem::transmute_copy::<T, f32>(&beta),
                    cast_mut(y),
                    yv.inc as i32,
                );
            }
        }
    }

    /// BLAS ger: A = alpha * x * y^T + A
    #[allow(clippy::too_many_arguments)]
    pub fn ger<T: BlasFloat>(
        alpha: T,
        x: &[T],
        xv: BlasVector,
        y: &[T],
        yv: BlasVector,
        a: &mut [T],
        am: BlasMatrix,
    ) {
        let layout = layout_of(am.layout);
        let (x, y, a) = (&x[xv.offset..], &y[yv.offset..], &mut a[am.offset..]);
        unsafe {
            if T::is_double() {
                cblas::dger(
                    layout,
                    am.rows as i32,
                    am.cols as i32,
                    std::mem::transmute_copy::<T, f64>(&alpha),
                    cast(x),
                    xv.inc as i32,
                    cast(y),
                    yv.inc as i32,
                    cast_mut(a),
                    am.ld as i32,
                );
            } else if T::is_single() {
                cblas::sger(
                    layout,
                    am.rows as i32,
                    am.cols as i32,
                    std::mem::transmute_copy::<T, f32>(&alpha),
                    cast(x),
                    xv.inc as i32,
                    cast(y),
                    yv.inc as i32,
                    cast_mut(a),
                    am.ld as i32,
                );
            }
        }
    }

    /// BLAS axpy: y = alpha * x + y
    pub fn axpy<T: BlasFloat>(alpha: T, x: &[T], xv: BlasVector, y: &mut [T], yv: BlasVector) {
        let n = xv.len as i32;
        let (x, y) = (&x[xv.offset..], &mut y[yv.offset..]);
        unsafe {
            if T::is_double() {
                let alpha = std::mem::transmute_copy::<T, f64>(&alpha);
                cblas::daxpy(n, alpha, cast(x), xv.inc as i32, cast_mut(y), yv.inc as i32);
            } else if T::is_single() {
                let alpha = std::mem::transmute_copy::<T, f32>(&alpha);
                cblas::saxpy(n, alpha, cast(x), xv.inc as i32, cast_mut(y), yv.inc as i32);
            }
        }
    }

    /// BLAS copy: y = x
    pub fn copy<T: BlasFloat>(x: &[T], xv: BlasVector, y: &mut [T], yv: BlasVector) {
        let n = xv.len as i32;
        let (x, y) = (&x[xv.offset..], &mut y[yv.offset..]);
        unsafe {
            if T::is_double() {
                cblas::dcopy(n, cast(x), xv.inc as i32, cast_mut(y), yv.inc as i32);
            } else if T::is_single() {
                cblas::scopy(n, cast(x), xv.inc as i32, cast_mut(y), yv.inc as i32);
            }
        }
    }

    /// BLAS scal: x = alpha * x
    pub fn scal<T: BlasFloat>(alpha: T, x: &mut [T], xv: BlasVector) {
        let n = xv.len as i32;
        let x = &mut x[xv.offset..];
        unsafe {
            if T::is_double() {
                let alpha = std::mem::transmute_copy::<T, f64>(&alpha);
                cblas::dscal(n, alpha, cast_mut(x), xv.inc as i32);
            } else if T::is_single() {
                let alpha = std::mem::transmute_copy::<T, f32>(&alpha);
                cblas::sscal(n, alpha, cast_mut(x), xv.inc as i32);
            }
        }
    }

    /// BLAS dot: result = x · y
    ///
    /// Returns `None` for element types without a CBLAS routine.
    pub fn dot<T: BlasFloat>(x: &[T], xv: BlasVector, y: &[T], yv: BlasVector) -> Option<T> {
        let n = xv.len as i32;
        let (x, y) = (&x[xv.offset..], &y[yv.offset..]);
        unsafe {
            if T::is_double() {
                let r = cblas::ddot(n, cast(x), xv.inc as i32, cast(y), yv.inc as i32);
                Some(std::mem::transmute_copy::<f64, T>(&r))
            } else if T::is_single() {
                let r = cblas::sdot(n, cast(x), xv.inc as i32, cast(y), yv.inc as i32);
                Some(std::mem::transmute_copy::<f32, T>(&r))
            } else {
                None
            }
        }
    }

    /// BLAS nrm2: result = ||x||_2
    pub fn nrm2<T: BlasFloat>(x: &[T], xv: BlasVector) -> Option<T> {
        let n = xv.len as i32;
        let x = &x[xv.offset..];
        unsafe {
            if T::is_double() {
                let r = cblas::dnrm2(n, cast(x), xv.inc as i32);
                Some(std::mem::transmute_copy::<f64, T>(&r))
            } else if T::is_single() {
                let r = cblas::snrm2(n, cast(x), xv.inc as i32);
                Some(std::mem::transmute_copy::<f32, T>(&r))
            } else {
                None
            }
        }
    }
}
