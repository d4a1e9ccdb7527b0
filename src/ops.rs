//! Element-wise operations and reductions.
//!
//! Order-insensitive work (fills, maps, sums) walks the matrix by best spans;
//! binary operations and reductions reporting an index walk both operands in
//! row-major logical order, so any pair of stride patterns lines up.

use std::sync::Arc;

use num_traits::Float;

use crate::iter::{BestSpan, Cursor, RowMajor, Span};
use crate::matrix::Matrix;
use crate::{MatrixScalar, Result, StridedError};

impl<T: MatrixScalar> Matrix<T> {
    // ========================================================================
    // Internal drivers
    // ========================================================================

    pub(crate) fn spans(&self) -> BestSpan {
        BestSpan::new(self)
    }

    /// Apply `f` to every element in place.
    pub(crate) fn map_inplace<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(T) -> T,
    {
        let mut data = self.block.write()?;
        for pos in self.spans().flat_map(Span::positions) {
            data[pos] = f(data[pos]);
        }
        Ok(())
    }

    /// Fold every element in unspecified order.
    pub(crate) fn fold<A, F>(&self, init: A, mut f: F) -> Result<A>
    where
        F: FnMut(A, T) -> A,
    {
        let data = self.block.read()?;
        Ok(self
            .spans()
            .flat_map(Span::positions)
            .fold(init, |acc, pos| f(acc, data[pos])))
    }

    /// `self[i] = f(self[i], other[i])` over row-major logical order.
    ///
    /// Operands must share the shape, or both be vectors of equal length;
    /// public callers check for identical dims first.
    pub(crate) fn zip_inplace<F>(&self, other: &Matrix<T>, mut f: F) -> Result<()>
    where
        F: FnMut(T, T) -> T,
    {
        check_vector_compatible(self, other)?;
        // Reading and writing one buffer at once would deadlock the guards
        let snapshot;
        let src = if self.shares_block(other) {
            snapshot = other.deep_clone()?;
            &snapshot
        } else {
            other
        };
        let input = src.block.read()?;
        let mut output = self.block.write()?;
        for (d, s) in Cursor::<RowMajor>::begin(self).zip(Cursor::<RowMajor>::begin(src)) {
            output[d] = f(output[d], input[s]);
        }
        Ok(())
    }

    fn zip_new<F>(&self, other: &Matrix<T>, f: F) -> Result<Matrix<T>>
    where
        F: FnMut(T, T) -> T,
    {
        check_same_dim(self, other)?;
        let out = self.deep_clone()?;
        out.zip_inplace(other, f)?;
        Ok(out)
    }

    // ========================================================================
    // Fills and unary maps
    // ========================================================================

    pub fn fill(&self, value: T) -> Result<()> {
        self.map_inplace(|_| value)
    }

    pub fn zeros(&self) -> Result<()> {
        self.fill(T::zero())
    }

    pub fn ones(&self) -> Result<()> {
        self.fill(T::one())
    }

    /// Add `value` to every element.
    pub fn scalar_add(&self, value: T) -> Result<()> {
        self.map_inplace(|x| x + value)
    }

    /// Clamp every element into `[lower, upper]`.
    pub fn clamp(&self, lower: T, upper: T) -> Result<()> {
        if lower > upper {
            return Err(StridedError::Unsupported("clamp requires lower <= upper"));
        }
        self.map_inplace(|x| x.max(lower).min(upper))
    }

    /// Natural logarithm.
    pub fn log(&self) -> Result<()> {
        self.map_inplace(Float::ln)
    }

    pub fn log1p(&self) -> Result<()> {
        self.map_inplace(Float::ln_1p)
    }

    pub fn exp(&self) -> Result<()> {
        self.map_inplace(Float::exp)
    }

    pub fn sqrt(&self) -> Result<()> {
        self.map_inplace(Float::sqrt)
    }

    pub fn pow(&self, exponent: T) -> Result<()> {
        self.map_inplace(|x| x.powf(exponent))
    }

    pub fn tanh(&self) -> Result<()> {
        self.map_inplace(Float::tanh)
    }

    /// Set every element on the main diagonal to `value`.
    ///
    /// All axes must have the same extent.
    pub fn diag(&self, value: T) -> Result<()> {
        let n = self.dims[0];
        if self.dims.iter().any(|&d| d != n) {
            return Err(StridedError::Unsupported(
                "diag requires all axes of equal extent",
            ));
        }
        let step: isize = self.strides.iter().sum();
        let mut data = self.block.write()?;
        let mut pos = self.offset as isize;
        for _ in 0..n {
            data[pos as usize] = value;
            pos += step;
        }
        Ok(())
    }

    /// Affinely map the current `[min, max]` onto `[rmin, rmax]`.
    ///
    /// A constant matrix becomes `rmin` everywhere.
    pub fn adjust_range(&self, rmin: T, rmax: T) -> Result<()> {
        let (mn, mx) = self.min_and_max()?;
        if mx == mn {
            return self.fill(rmin);
        }
        let ratio = (rmax - rmin) / (mx - mn);
        self.map_inplace(|x| (x - mn) * ratio + rmin)
    }

    // ========================================================================
    // Binary element-wise ops
    // ========================================================================

    /// `self += other`
    pub fn add(&self, other: &Matrix<T>) -> Result<()> {
        check_same_dim(self, other)?;
        self.zip_inplace(other, |a, b| a + b)
    }

    /// `self -= other`
    pub fn subtract(&self, other: &Matrix<T>) -> Result<()> {
        check_same_dim(self, other)?;
        self.zip_inplace(other, |a, b| a - b)
    }

    /// `self *= other`, element by element.
    pub fn elementwise_multiply(&self, other: &Matrix<T>) -> Result<()> {
        check_same_dim(self, other)?;
        self.zip_inplace(other, |a, b| a * b)
    }

    /// New matrix holding `self + other`.
    pub fn addition(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_new(other, |a, b| a + b)
    }

    /// New matrix holding `self - other`.
    pub fn subtraction(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_new(other, |a, b| a - b)
    }

    /// New matrix holding the element-wise product.
    pub fn cmul(&self, other: &Matrix<T>) -> Result<Matrix<T>> {
        self.zip_new(other, |a, b| a * b)
    }

    // ========================================================================
    // Reductions
    // ========================================================================

    pub fn sum(&self) -> Result<T> {
        self.fold(T::zero(), |acc, x| acc + x)
    }

    /// Smallest element and its row-major logical index.
    pub fn min(&self) -> Result<(T, usize)> {
        self.arg_extreme(|candidate, best| candidate < best)
    }

    /// Largest element and its row-major logical index.
    pub fn max(&self) -> Result<(T, usize)> {
        self.arg_extreme(|candidate, best| candidate > best)
    }

    /// Smallest and largest element in one pass.
    pub fn min_and_max(&self) -> Result<(T, T)> {
        let data = self.block.read()?;
        let mut positions = Cursor::<RowMajor>::begin(self);
        let first = positions.next().ok_or(StridedError::Unsupported(
            "reduction over an empty matrix",
        ))?;
        let init = (data[first], data[first]);
        Ok(positions.fold(init, |(mn, mx), pos| {
            let x = data[pos];
            (if x < mn { x } else { mn }, if x > mx { x } else { mx })
        }))
    }

    fn arg_extreme<F>(&self, better: F) -> Result<(T, usize)>
    where
        F: Fn(T, T) -> bool,
    {
        let data = self.block.read()?;
        let mut positions = Cursor::<RowMajor>::begin(self);
        let first = positions.next().ok_or(StridedError::Unsupported(
            "reduction over an empty matrix",
        ))?;
        let mut best = (data[first], 0);
        for (i, pos) in positions.enumerate() {
            if better(data[pos], best.0) {
                best = (data[pos], i + 1);
            }
        }
        Ok(best)
    }

    /// Element-wise comparison within absolute tolerance `epsilon`.
    ///
    /// Matrices of different shape are never equal.
    pub fn equals(&self, other: &Matrix<T>, epsilon: T) -> Result<bool> {
        if !self.same_dim(other) {
            return Ok(false);
        }
        let a = self.block.read()?;
        // A second read guard on a shared block would be redundant
        let b_guard;
        let b = if Arc::ptr_eq(&self.block, &other.block) {
            &a
        } else {
            b_guard = other.block.read()?;
            &b_guard
        };
        Ok(Cursor::<RowMajor>::begin(self)
            .zip(Cursor::<RowMajor>::begin(other))
            .all(|(p, q)| (a[p] - b[q]).abs() <= epsilon))
    }

    // ========================================================================
    // Column access (rank 2)
    // ========================================================================

    /// Shallow view of column `col` as an `N x 1` matrix.
    pub fn column(&self, col: usize) -> Result<Matrix<T>> {
        self.check_rank2("column access requires a rank-2 matrix")?;
        self.sub_view(&[0, col], &[self.dims[0], 1], false)
    }

    /// Copy of column `col`.
    pub fn get_col(&self, col: usize) -> Result<Vec<T>> {
        self.column(col)?.to_vec()
    }

    /// Overwrite column `col` with the elements of vector `values`.
    pub fn put_col(&self, col: usize, values: &Matrix<T>) -> Result<()> {
        self.put_sub_col(col, 0, values)
    }

    /// Overwrite rows `first_row..first_row + len` of column `col`.
    pub fn put_sub_col(&self, col: usize, first_row: usize, values: &Matrix<T>) -> Result<()> {
        self.check_rank2("column access requires a rank-2 matrix")?;
        if !values.is_vector() {
            return Err(StridedError::ShapeMismatch(
                values.dims.to_vec(),
                vec![values.size()],
            ));
        }
        let target = self.sub_view(&[first_row, col], &[values.size(), 1], false)?;
        target.zip_inplace(values, |_, v| v)
    }

    fn check_rank2(&self, what: &'static str) -> Result<()> {
        if self.num_dim() != 2 {
            return Err(StridedError::Unsupported(what));
        }
        Ok(())
    }
}

/// Identical dims, as every public element-wise op requires.
pub(crate) fn check_same_dim<T>(a: &Matrix<T>, b: &Matrix<T>) -> Result<()> {
    if a.same_dim(b) {
        Ok(())
    } else {
        Err(StridedError::ShapeMismatch(a.dims.to_vec(), b.dims.to_vec()))
    }
}

/// Same shape, or two vectors of equal length. Only vector-operand paths
/// (column puts, dot) accept the looser form.
pub(crate) fn check_vector_compatible<T>(a: &Matrix<T>, b: &Matrix<T>) -> Result<()> {
    if a.same_dim(b) || (a.is_vector() && b.is_vector() && a.size() == b.size()) {
        Ok(())
    } else {
        Err(StridedError::ShapeMismatch(a.dims.to_vec(), b.dims.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MajorOrder;
    use approx::assert_relative_eq;

    fn from_rows(dims: &[usize], data: &[f64]) -> Matrix<f64> {
        Matrix::from_vec(dims, MajorOrder::RowMajor, data.to_vec()).unwrap()
    }

    fn arange(dims: &[usize]) -> Matrix<f64> {
        let n: usize = dims.iter().product();
        Matrix::from_vec(dims, MajorOrder::RowMajor, (0..n).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn test_fill_sub_view_only() {
        let m = arange(&[3, 4]);
        let sub = m.sub_view(&[1, 1], &[2, 2], false).unwrap();
        sub.fill(-1.0).unwrap();
        assert_eq!(
            m.to_vec().unwrap(),
            vec![0.0, 1.0, 2.0, 3.0, 4.0, -1.0, -1.0, 7.0, 8.0, -1.0, -1.0, 11.0]
        );
    }

    #[test]
    fn test_unary_maps() {
        let m = from_rows(&[3], &[1.0, 4.0, 9.0]);
        m.sqrt().unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![1.0, 2.0, 3.0]);
        m.pow(2.0).unwrap();
        m.scalar_add(-1.0).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 3.0, 8.0]);
        m.exp().unwrap();
        m.log().unwrap();
        let v = m.to_vec().unwrap();
        assert_relative_eq!(v[1], 3.0, epsilon = 1e-12);
        m.zeros().unwrap();
        m.log1p().unwrap();
        m.tanh().unwrap();
        assert_eq!(m.sum().unwrap(), 0.0);
    }

    #[test]
    fn test_clamp() {
        let m = from_rows(&[4], &[-2.0, 0.5, 1.5, 3.0]);
        m.clamp(0.0, 1.0).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 0.5, 1.0, 1.0]);
        assert!(m.clamp(1.0, 0.0).is_err());
    }

    #[test]
    fn test_add_across_layouts() {
        let a = arange(&[2, 3]);
        let b = arange(&[3, 2]).transpose().unwrap();
        // b[i][j] = 2 * j + i
        a.add(&b).unwrap();
        assert_eq!(a.to_vec().unwrap(), vec![0.0, 3.0, 6.0, 4.0, 7.0, 10.0]);
    }

    #[test]
    fn test_binary_shape_mismatch() {
        let a = arange(&[2, 3]);
        let b = arange(&[3, 2]);
        assert_eq!(
            a.subtract(&b).unwrap_err(),
            StridedError::ShapeMismatch(vec![2, 3], vec![3, 2])
        );
    }

    #[test]
    fn test_vectors_of_different_shape_are_rejected() {
        let row = arange(&[1, 3]);
        let col = arange(&[3, 1]);
        let flat = arange(&[3]);
        assert_eq!(
            row.add(&col).unwrap_err(),
            StridedError::ShapeMismatch(vec![1, 3], vec![3, 1])
        );
        assert_eq!(
            flat.elementwise_multiply(&col).unwrap_err(),
            StridedError::ShapeMismatch(vec![3], vec![3, 1])
        );
        assert!(matches!(
            row.addition(&col),
            Err(StridedError::ShapeMismatch(_, _))
        ));
        assert!(matches!(
            col.cmul(&flat),
            Err(StridedError::ShapeMismatch(_, _))
        ));
        assert_eq!(row.to_vec().unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_put_col_accepts_any_vector_shape() {
        let m = Matrix::<f64>::from_shape(&[3, 2], MajorOrder::RowMajor).unwrap();
        m.put_col(1, &arange(&[1, 3])).unwrap();
        m.put_col(0, &arange(&[3])).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_aliasing_operands_are_snapshotted() {
        let m = arange(&[4]);
        let rev = Matrix::from_parts(Arc::clone(m.raw_data()), 3, &[4], &[-1]).unwrap();
        m.add(&rev).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_new_matrix_ops_leave_inputs() {
        let a = from_rows(&[2], &[1.0, 2.0]);
        let b = from_rows(&[2], &[3.0, 5.0]);
        assert_eq!(a.addition(&b).unwrap().to_vec().unwrap(), vec![4.0, 7.0]);
        assert_eq!(a.subtraction(&b).unwrap().to_vec().unwrap(), vec![-2.0, -3.0]);
        assert_eq!(a.cmul(&b).unwrap().to_vec().unwrap(), vec![3.0, 10.0]);
        assert_eq!(a.to_vec().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_min_max_index_is_row_major() {
        let m = from_rows(&[2, 3], &[4.0, -1.0, 7.0, 7.0, 0.0, -1.0]);
        let t = m.transpose().unwrap();
        assert_eq!(m.min().unwrap(), (-1.0, 1));
        assert_eq!(m.max().unwrap(), (7.0, 2));
        // t rows: [4, 7], [-1, 0], [7, -1]
        assert_eq!(t.min().unwrap(), (-1.0, 2));
        assert_eq!(t.max().unwrap(), (7.0, 1));
        assert_eq!(t.min_and_max().unwrap(), (-1.0, 7.0));
    }

    #[test]
    fn test_reduction_on_empty_matrix() {
        let m = Matrix::<f64>::from_shape(&[0], MajorOrder::RowMajor).unwrap();
        assert!(m.max().is_err());
        assert_eq!(m.sum().unwrap(), 0.0);
    }

    #[test]
    fn test_equals_with_tolerance() {
        let a = from_rows(&[2], &[1.0, 2.0]);
        let b = from_rows(&[2], &[1.0, 2.05]);
        assert!(!a.equals(&b, 0.01).unwrap());
        assert!(a.equals(&b, 0.1).unwrap());
        assert!(!a.equals(&arange(&[2, 1]), 10.0).unwrap());
        assert!(a.equals(&a.shallow_copy(), 0.0).unwrap());
    }

    #[test]
    fn test_adjust_range() {
        let m = from_rows(&[3], &[2.0, 4.0, 6.0]);
        m.adjust_range(0.0, 1.0).unwrap();
        assert_eq!(m.to_vec().unwrap(), vec![0.0, 0.5, 1.0]);
        let flat = from_rows(&[2], &[5.0, 5.0]);
        flat.adjust_range(-1.0, 1.0).unwrap();
        assert_eq!(flat.to_vec().unwrap(), vec![-1.0, -1.0]);
    }

    #[test]
    fn test_diag() {
        let m = Matrix::<f64>::from_shape(&[3, 3], MajorOrder::ColMajor).unwrap();
        m.diag(1.0).unwrap();
        assert_eq!(
            m.to_vec().unwrap(),
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert!(arange(&[2, 3]).diag(1.0).is_err());
    }

    #[test]
    fn test_columns() {
        let m = arange(&[3, 2]);
        assert_eq!(m.get_col(1).unwrap(), vec![1.0, 3.0, 5.0]);
        m.put_col(0, &from_rows(&[3], &[9.0, 8.0, 7.0])).unwrap();
        m.put_sub_col(1, 1, &from_rows(&[1, 2], &[-1.0, -2.0])).unwrap();
        assert_eq!(
            m.to_vec().unwrap(),
            vec![9.0, 1.0, 8.0, -1.0, 7.0, -2.0]
        );
        assert!(m.put_sub_col(1, 2, &from_rows(&[2], &[0.0, 0.0])).is_err());
    }
}
