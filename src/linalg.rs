//! BLAS-delegated operations with a uniform generic fallback.
//!
//! Every operation here follows one dispatch policy: when the `blas` feature
//! is enabled, `T` is f32/f64 and every operand has a BLAS-expressible
//! stride pattern (see [`crate::blas`]), CBLAS runs; otherwise the generic
//! strided loop runs. The fallback is never an error.
//!
//! Operands that share a buffer with the output are snapshotted first, so
//! `m.axpy(1.0, &m.transpose()?)` and friends are well defined.

use crate::blas::{flat_pair, flat_vector, is_blas_matrix, is_blas_vector};
use crate::iter::{Cursor, RowMajor};
use crate::matrix::Matrix;
use crate::ops::{check_same_dim, check_vector_compatible};
use crate::{MatrixScalar, Result, StridedError};

#[cfg(feature = "blas")]
use crate::blas::{blas_enabled, blas_impl};

// ============================================================================
// Transpose flag
// ============================================================================

/// Whether an operand enters a product as stored or transposed.
///
/// Transposition is applied as a view; no data is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transpose {
    /// No transpose operation
    #[default]
    NoTrans,
    /// Transpose operation
    Trans,
}

impl Transpose {
    /// Convert to CBLAS character representation.
    pub fn to_char(self) -> char {
        match self {
            Transpose::NoTrans => 'N',
            Transpose::Trans => 'T',
        }
    }
}

fn apply_transpose<T>(m: &Matrix<T>, trans: Transpose) -> Result<Matrix<T>> {
    require_rank2(m)?;
    match trans {
        Transpose::NoTrans => Ok(m.shallow_copy()),
        Transpose::Trans => m.transpose(),
    }
}

fn require_rank2<T>(m: &Matrix<T>) -> Result<()> {
    if m.num_dim() != 2 {
        return Err(StridedError::RankMismatch(m.num_dim(), 2));
    }
    Ok(())
}

fn require_vector<T>(m: &Matrix<T>, len: usize) -> Result<()> {
    if !m.is_vector() || m.size() != len {
        return Err(StridedError::ShapeMismatch(m.dims().to_vec(), vec![len]));
    }
    Ok(())
}

#[inline]
fn pos2<T>(m: &Matrix<T>, i: usize, j: usize) -> usize {
    (m.offset as isize + i as isize * m.strides[0] + j as isize * m.strides[1]) as usize
}

impl<T: MatrixScalar> Matrix<T> {
    /// `src` itself, or a private copy if it shares this matrix's buffer.
    fn detach(&self, src: Matrix<T>) -> Result<Matrix<T>> {
        if self.shares_block(&src) {
            log::debug!("operand aliases the output buffer, snapshotting {:?}", src.dims());
            src.deep_clone()
        } else {
            Ok(src)
        }
    }

    /// Rank-1 operands as `1 x K` rows; rank-2 operands unchanged.
    fn as_row_matrix(&self) -> Result<Matrix<T>> {
        match self.num_dim() {
            1 => Ok(self.with_shape(vec![1, self.dims[0]], vec![self.strides[0]; 2])),
            2 => Ok(self.shallow_copy()),
            _ => Err(StridedError::RankMismatch(self.num_dim(), 2)),
        }
    }

    /// Rank-1 operands as `K x 1` columns; rank-2 operands unchanged.
    fn as_col_matrix(&self) -> Result<Matrix<T>> {
        match self.num_dim() {
            1 => Ok(self.with_shape(vec![self.dims[0], 1], vec![self.strides[0]; 2])),
            2 => Ok(self.shallow_copy()),
            _ => Err(StridedError::RankMismatch(self.num_dim(), 2)),
        }
    }

    // ========================================================================
    // Level 1
    // ========================================================================

    /// Copy every element of `src` into `self`.
    pub fn copy_from(&self, src: &Matrix<T>) -> Result<()> {
        check_same_dim(self, src)?;
        let src = self.detach(src.shallow_copy())?;
        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let Some((xv, yv)) = flat_pair(&src, self) {
                    log::debug!("copy: cblas over {} elements", xv.len);
                    let x = src.block.read()?;
                    let mut y = self.block.write()?;
                    blas_impl::copy(x.as_slice(), xv, y.as_mut_slice(), yv);
                    return Ok(());
                }
            }
        }
        log_fallback("copy", flat_pair(&src, self).is_some());
        self.zip_inplace(&src, |_, x| x)
    }

    /// `self += alpha * x`
    pub fn axpy(&self, alpha: T, x: &Matrix<T>) -> Result<()> {
        check_same_dim(self, x)?;
        let x = self.detach(x.shallow_copy())?;
        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let Some((xv, yv)) = flat_pair(&x, self) {
                    log::debug!("axpy: cblas over {} elements", xv.len);
                    let xd = x.block.read()?;
                    let mut yd = self.block.write()?;
                    blas_impl::axpy(alpha, xd.as_slice(), xv, yd.as_mut_slice(), yv);
                    return Ok(());
                }
            }
        }
        log_fallback("axpy", flat_pair(&x, self).is_some());
        self.zip_inplace(&x, |y, x| y + alpha * x)
    }

    /// `self *= alpha`
    pub fn scale(&self, alpha: T) -> Result<()> {
        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let Some(xv) = flat_vector(self) {
                    let mut data = self.block.write()?;
                    blas_impl::scal(alpha, data.as_mut_slice(), xv);
                    return Ok(());
                }
            }
        }
        log_fallback("scale", flat_vector(self).is_some());
        self.map_inplace(|x| x * alpha)
    }

    /// Sum of element-wise products.
    pub fn dot(&self, other: &Matrix<T>) -> Result<T> {
        check_vector_compatible(self, other)?;
        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let Some((xv, yv)) = flat_pair(self, other) {
                    let x = self.block.read()?;
                    let y = other.block.read()?;
                    if let Some(r) = blas_impl::dot(x.as_slice(), xv, y.as_slice(), yv) {
                        return Ok(r);
                    }
                }
            }
        }
        log_fallback("dot", flat_pair(self, other).is_some());
        let x = self.block.read()?;
        let y = other.block.read()?;
        Ok(Cursor::<RowMajor>::begin(self)
            .zip(Cursor::<RowMajor>::begin(other))
            .fold(T::zero(), |acc, (p, q)| acc + x[p] * y[q]))
    }

    /// Euclidean norm of all elements.
    pub fn norm2(&self) -> Result<T> {
        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let Some(xv) = flat_vector(self) {
                    let x = self.block.read()?;
                    if let Some(r) = blas_impl::nrm2(x.as_slice(), xv) {
                        return Ok(r);
                    }
                }
            }
        }
        log_fallback("norm2", flat_vector(self).is_some());
        Ok(self.fold(T::zero(), |acc, x| acc + x * x)?.sqrt())
    }

    // ========================================================================
    // Level 2
    // ========================================================================

    /// `self = alpha * op(a) * x + beta * self`, with `self` a vector.
    pub fn gemv(
        &self,
        trans_a: Transpose,
        alpha: T,
        a: &Matrix<T>,
        x: &Matrix<T>,
        beta: T,
    ) -> Result<()> {
        let a = self.detach(apply_transpose(a, trans_a)?)?;
        let (n, k) = (a.dims[0], a.dims[1]);
        require_vector(x, k)?;
        require_vector(self, n)?;
        let x = self.detach(x.shallow_copy())?;

        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let (Some(am), Some(xv), Some(yv)) =
                    (is_blas_matrix(&a), is_blas_vector(&x), is_blas_vector(self))
                {
                    log::debug!("gemv: cblas {}x{} ({:?})", n, k, am.layout);
                    let ad = a.block.read()?;
                    let xd = x.block.read()?;
                    let mut yd = self.block.write()?;
                    blas_impl::gemv(
                        alpha,
                        ad.as_slice(),
                        am,
                        xd.as_slice(),
                        xv,
                        beta,
                        yd.as_mut_slice(),
                        yv,
                    );
                    return Ok(());
                }
            }
        }
        log_fallback(
            "gemv",
            is_blas_matrix(&a).is_some()
                && is_blas_vector(&x).is_some()
                && is_blas_vector(self).is_some(),
        );
        generic_gemv(alpha, &a, &x, beta, self)
    }

    /// `self += alpha * x * y^T`, with `self` of shape `len(x) x len(y)`.
    pub fn ger(&self, alpha: T, x: &Matrix<T>, y: &Matrix<T>) -> Result<()> {
        require_rank2(self)?;
        require_vector(x, self.dims[0])?;
        require_vector(y, self.dims[1])?;
        let x = self.detach(x.shallow_copy())?;
        let y = self.detach(y.shallow_copy())?;

        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let (Some(xv), Some(yv), Some(am)) =
                    (is_blas_vector(&x), is_blas_vector(&y), is_blas_matrix(self))
                {
                    log::debug!("ger: cblas {}x{} ({:?})", am.rows, am.cols, am.layout);
                    let xd = x.block.read()?;
                    let yd = y.block.read()?;
                    let mut ad = self.block.write()?;
                    blas_impl::ger(
                        alpha,
                        xd.as_slice(),
                        xv,
                        yd.as_slice(),
                        yv,
                        ad.as_mut_slice(),
                        am,
                    );
                    return Ok(());
                }
            }
        }
        log_fallback(
            "ger",
            is_blas_vector(&x).is_some()
                && is_blas_vector(&y).is_some()
                && is_blas_matrix(self).is_some(),
        );
        generic_ger(alpha, &x, &y, self)
    }

    // ========================================================================
    // Level 3
    // ========================================================================

    /// `self = alpha * op(a) * op(b) + beta * self`
    ///
    /// `op(a)` must be `N x K`, `op(b)` `K x M` and `self` `N x M`. With a zero
    /// `beta` the previous contents of `self` are ignored.
    pub fn gemm(
        &self,
        trans_a: Transpose,
        trans_b: Transpose,
        alpha: T,
        a: &Matrix<T>,
        b: &Matrix<T>,
        beta: T,
    ) -> Result<()> {
        require_rank2(self)?;
        let a = apply_transpose(a, trans_a)?;
        let b = apply_transpose(b, trans_b)?;
        let (n, k) = (a.dims[0], a.dims[1]);
        let m = b.dims[1];
        if b.dims[0] != k {
            return Err(StridedError::ShapeMismatch(a.dims.to_vec(), b.dims.to_vec()));
        }
        if self.dims() != [n, m].as_slice() {
            return Err(StridedError::ShapeMismatch(self.dims.to_vec(), vec![n, m]));
        }
        let a = self.detach(a)?;
        let b = self.detach(b)?;

        #[cfg(feature = "blas")]
        {
            if blas_enabled::<T>() {
                if let (Some(am), Some(bm), Some(cm)) =
                    (is_blas_matrix(&a), is_blas_matrix(&b), is_blas_matrix(self))
                {
                    log::debug!("gemm: cblas {}x{}x{} ({:?} output)", n, k, m, cm.layout);
                    let ad = a.block.read()?;
                    let bd = b.block.read()?;
                    let mut cd = self.block.write()?;
                    blas_impl::gemm(
                        alpha,
                        ad.as_slice(),
                        am,
                        bd.as_slice(),
                        bm,
                        beta,
                        cd.as_mut_slice(),
                        cm,
                    );
                    return Ok(());
                }
            }
        }
        log_fallback(
            "gemm",
            is_blas_matrix(&a).is_some()
                && is_blas_matrix(&b).is_some()
                && is_blas_matrix(self).is_some(),
        );
        generic_gemm(alpha, &a, &b, beta, self)
    }

    /// Fresh `N x M` product of `self` (`N x K`) and `other` (`K x M`).
    ///
    /// A rank-1 `self` is a row and a rank-1 `other` a column. A single
    /// output column runs as gemv, an inner extent of one as ger.
    pub fn multiply(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        let a = self.as_row_matrix()?;
        let b = other.as_col_matrix()?;
        let (n, k) = (a.dims[0], a.dims[1]);
        let m = b.dims[1];
        if b.dims[0] != k {
            return Err(StridedError::ShapeMismatch(
                self.dims.to_vec(),
                other.dims.to_vec(),
            ));
        }
        let out = Matrix::from_shape(&[n, m], self.order)?;
        if m == 1 {
            out.gemv(Transpose::NoTrans, T::one(), &a, &b, T::zero())?;
        } else if k == 1 {
            out.ger(T::one(), &a, &b)?;
        } else {
            out.gemm(
                Transpose::NoTrans,
                Transpose::NoTrans,
                T::one(),
                &a,
                &b,
                T::zero(),
            )?;
        }
        Ok(out)
    }
}

fn log_fallback(op: &str, eligible: bool) {
    if eligible {
        log::debug!("{op}: cblas unavailable for this build or type, generic path");
    } else {
        log::debug!("{op}: stride pattern not BLAS-expressible, generic path");
    }
}

// ============================================================================
// Generic fallback implementations (always available)
// ============================================================================

fn generic_gemm<T: MatrixScalar>(
    alpha: T,
    a: &Matrix<T>,
    b: &Matrix<T>,
    beta: T,
    c: &Matrix<T>,
) -> Result<()> {
    let (n, k, m) = (a.dims[0], a.dims[1], b.dims[1]);
    let ad = a.block.read()?;
    let bd = b.block.read()?;
    let mut cd = c.block.write()?;
    for i in 0..n {
        for j in 0..m {
            let mut sum = T::zero();
            for l in 0..k {
                sum = sum + ad[pos2(a, i, l)] * bd[pos2(b, l, j)];
            }
            let cp = pos2(c, i, j);
            cd[cp] = if beta == T::zero() {
                alpha * sum
            } else {
                alpha * sum + beta * cd[cp]
            };
        }
    }
    Ok(())
}

fn generic_gemv<T: MatrixScalar>(
    alpha: T,
    a: &Matrix<T>,
    x: &Matrix<T>,
    beta: T,
    y: &Matrix<T>,
) -> Result<()> {
    let k = a.dims[1];
    let xs: Vec<usize> = Cursor::<RowMajor>::begin(x).collect();
    let ad = a.block.read()?;
    let xd = x.block.read()?;
    let mut yd = y.block.write()?;
    for (i, yp) in Cursor::<RowMajor>::begin(y).enumerate() {
        let mut sum = T::zero();
        for (l, &xp) in xs.iter().enumerate().take(k) {
            sum = sum + ad[pos2(a, i, l)] * xd[xp];
        }
        yd[yp] = if beta == T::zero() {
            alpha * sum
        } else {
            alpha * sum + beta * yd[yp]
        };
    }
    Ok(())
}

fn generic_ger<T: MatrixScalar>(
    alpha: T,
    x: &Matrix<T>,
    y: &Matrix<T>,
    a: &Matrix<T>,
) -> Result<()> {
    let ys: Vec<usize> = Cursor::<RowMajor>::begin(y).collect();
    let xd = x.block.read()?;
    let yd = y.block.read()?;
    let mut ad = a.block.write()?;
    for (i, xp) in Cursor::<RowMajor>::begin(x).enumerate() {
        let xi = alpha * xd[xp];
        for (j, &yp) in ys.iter().enumerate() {
            let p = pos2(a, i, j);
            ad[p] = ad[p] + xi * yd[yp];
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MajorOrder;
    use approx::assert_relative_eq;

    fn mat(dims: &[usize], order: MajorOrder, data: &[f64]) -> Matrix<f64> {
        Matrix::from_vec(dims, order, data.to_vec()).unwrap()
    }

    fn arange(dims: &[usize]) -> Matrix<f64> {
        let n: usize = dims.iter().product();
        Matrix::from_vec(dims, MajorOrder::RowMajor, (0..n).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn test_gemm_basic() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]] => [[19, 22], [43, 50]]
        let a = mat(&[2, 2], MajorOrder::RowMajor, &[1.0, 2.0, 3.0, 4.0]);
        let b = mat(&[2, 2], MajorOrder::RowMajor, &[5.0, 6.0, 7.0, 8.0]);
        let c = Matrix::<f64>::from_shape(&[2, 2], MajorOrder::RowMajor).unwrap();
        c.gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, &a, &b, 0.0).unwrap();
        assert_eq!(c.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_gemm_with_alpha_beta() {
        let a = mat(&[2, 2], MajorOrder::RowMajor, &[1.0, 2.0, 3.0, 4.0]);
        let b = mat(&[2, 2], MajorOrder::RowMajor, &[5.0, 6.0, 7.0, 8.0]);
        let c = mat(&[2, 2], MajorOrder::RowMajor, &[1.0; 4]);
        // C = 2 * A * B + 3 * C = [[41, 47], [89, 103]]
        c.gemm(Transpose::NoTrans, Transpose::NoTrans, 2.0, &a, &b, 3.0).unwrap();
        assert_eq!(c.to_vec().unwrap(), vec![41.0, 47.0, 89.0, 103.0]);
    }

    #[test]
    fn test_gemm_transpose_flags_and_col_major_output() {
        // A^T stored: 3x2, B^T stored: 2x3
        let at = arange(&[3, 2]);
        let bt = arange(&[2, 3]);
        let c = Matrix::<f64>::from_shape(&[2, 2], MajorOrder::ColMajor).unwrap();
        c.gemm(Transpose::Trans, Transpose::Trans, 1.0, &at, &bt, 0.0).unwrap();
        // A = [[0, 2, 4], [1, 3, 5]], B = [[0, 3], [1, 4], [2, 5]]
        assert_eq!(c.to_vec().unwrap(), vec![10.0, 28.0, 13.0, 40.0]);
    }

    #[test]
    fn test_gemm_strided_operands() {
        let big = arange(&[4, 6]);
        let a = big.sub_view(&[0, 0], &[2, 3], false).unwrap();
        let b = mat(&[3, 1], MajorOrder::RowMajor, &[1.0, 1.0, 1.0]);
        let c = Matrix::<f64>::from_shape(&[2, 1], MajorOrder::RowMajor).unwrap();
        c.gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, &a, &b, 0.0).unwrap();
        assert_eq!(c.to_vec().unwrap(), vec![3.0, 21.0]);
    }

    #[test]
    fn test_gemm_shape_errors() {
        let a = arange(&[2, 3]);
        let c = Matrix::<f64>::from_shape(&[2, 2], MajorOrder::RowMajor).unwrap();
        assert!(matches!(
            c.gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, &a, &a, 0.0),
            Err(StridedError::ShapeMismatch(..))
        ));
        assert!(matches!(
            c.gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, &arange(&[4]), &a, 0.0),
            Err(StridedError::RankMismatch(1, 2))
        ));
    }

    #[test]
    fn test_gemm_output_aliases_input() {
        let a = mat(&[2, 2], MajorOrder::RowMajor, &[1.0, 2.0, 3.0, 4.0]);
        let a2 = a.shallow_copy();
        a.gemm(Transpose::NoTrans, Transpose::NoTrans, 1.0, &a2, &a2, 0.0).unwrap();
        assert_eq!(a.to_vec().unwrap(), vec![7.0, 10.0, 15.0, 22.0]);
    }

    #[test]
    fn test_gemv_and_transposed() {
        let a = arange(&[2, 3]);
        let x = mat(&[3], MajorOrder::RowMajor, &[1.0, 1.0, 1.0]);
        let y = Matrix::<f64>::from_shape(&[2], MajorOrder::RowMajor).unwrap();
        y.gemv(Transpose::NoTrans, 1.0, &a, &x, 0.0).unwrap();
        assert_eq!(y.to_vec().unwrap(), vec![3.0, 12.0]);

        let x2 = mat(&[2, 1], MajorOrder::RowMajor, &[1.0, 2.0]);
        let y2 = mat(&[1, 3], MajorOrder::RowMajor, &[1.0, 1.0, 1.0]);
        y2.gemv(Transpose::Trans, 1.0, &a, &x2, 1.0).unwrap();
        assert_eq!(y2.to_vec().unwrap(), vec![7.0, 10.0, 13.0]);
    }

    #[test]
    fn test_ger() {
        let a = Matrix::<f64>::from_shape(&[2, 3], MajorOrder::ColMajor).unwrap();
        let x = mat(&[2], MajorOrder::RowMajor, &[1.0, 2.0]);
        let y = mat(&[3], MajorOrder::RowMajor, &[1.0, 10.0, 100.0]);
        a.ger(2.0, &x, &y).unwrap();
        assert_eq!(
            a.to_vec().unwrap(),
            vec![2.0, 20.0, 200.0, 4.0, 40.0, 400.0]
        );
        assert!(a.ger(1.0, &y, &x).is_err());
    }

    #[test]
    fn test_dot_and_norm2() {
        let x = mat(&[4], MajorOrder::RowMajor, &[1.0, 2.0, 3.0, 4.0]);
        let y = mat(&[4, 1], MajorOrder::RowMajor, &[5.0, 6.0, 7.0, 8.0]);
        // 1*5 + 2*6 + 3*7 + 4*8 = 70
        assert_eq!(x.dot(&y).unwrap(), 70.0);
        assert_relative_eq!(x.norm2().unwrap(), 30.0f64.sqrt(), epsilon = 1e-12);
        let strided = arange(&[3, 4]).sub_view(&[0, 0], &[3, 1], false).unwrap();
        assert_relative_eq!(strided.norm2().unwrap(), 80.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_axpy_and_copy() {
        let x = mat(&[3], MajorOrder::RowMajor, &[1.0, 2.0, 3.0]);
        let y = mat(&[3], MajorOrder::RowMajor, &[10.0, 20.0, 30.0]);
        y.axpy(2.0, &x).unwrap();
        assert_eq!(y.to_vec().unwrap(), vec![12.0, 24.0, 36.0]);

        let m = arange(&[2, 2]);
        let t = m.transpose().unwrap();
        let out = Matrix::<f64>::from_shape(&[2, 2], MajorOrder::RowMajor).unwrap();
        out.copy_from(&t).unwrap();
        assert_eq!(out.to_vec().unwrap(), vec![0.0, 2.0, 1.0, 3.0]);
        // Self-transpose accumulate goes through a snapshot
        m.axpy(1.0, &t).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 3.0, 3.0, 6.0]);
    }

    #[test]
    fn test_copy_and_axpy_require_same_dims() {
        let row = mat(&[1, 3], MajorOrder::RowMajor, &[1.0, 2.0, 3.0]);
        let col = mat(&[3, 1], MajorOrder::RowMajor, &[4.0, 5.0, 6.0]);
        assert_eq!(
            row.copy_from(&col).unwrap_err(),
            StridedError::ShapeMismatch(vec![1, 3], vec![3, 1])
        );
        assert!(matches!(
            row.axpy(1.0, &col),
            Err(StridedError::ShapeMismatch(_, _))
        ));
        assert_eq!(row.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
        // dot accepts any pair of equal-length vectors
        assert_relative_eq!(row.dot(&col).unwrap(), 32.0);
    }

    #[test]
    fn test_scale_strided() {
        let m = arange(&[3, 3]);
        let col = m.column(1).unwrap();
        col.scale(10.0).unwrap();
        assert_eq!(m.get_col(1).unwrap(), vec![10.0, 40.0, 70.0]);
        assert_eq!(m.get(&[0, 0]).unwrap(), 0.0);
    }

    #[test]
    fn test_multiply_dispatch() {
        let a = arange(&[2, 3]);
        let b = arange(&[3, 2]);
        let c = a.multiply(&b).unwrap();
        // [[0,1,2],[3,4,5]] x [[0,1],[2,3],[4,5]]
        assert_eq!(c.to_vec().unwrap(), vec![10.0, 13.0, 28.0, 40.0]);

        let v = mat(&[3], MajorOrder::RowMajor, &[1.0, 0.0, 1.0]);
        let av = a.multiply(&v).unwrap();
        assert_eq!(av.dims(), &[2, 1]);
        assert_eq!(av.to_vec().unwrap(), vec![2.0, 8.0]);

        let col = mat(&[2, 1], MajorOrder::RowMajor, &[1.0, 2.0]);
        let row = mat(&[1, 2], MajorOrder::RowMajor, &[3.0, 4.0]);
        assert_eq!(
            col.multiply(&row).unwrap().to_vec().unwrap(),
            vec![3.0, 4.0, 6.0, 8.0]
        );
        assert!(a.multiply(&a).is_err());
    }

    #[test]
    fn test_transpose_char() {
        assert_eq!(Transpose::NoTrans.to_char(), 'N');
        assert_eq!(Transpose::Trans.to_char(), 'T');
    }
}
