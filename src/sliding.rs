//! Sliding-window enumeration of sub-matrix patches.

use crate::matrix::Matrix;
use crate::{Result, StridedError};

/// Per-axis window configuration. Unset fields take defaults derived from
/// the parent matrix when the window is built.
///
/// Defaults: the window spans every axis fully except axis 0, where it is 1;
/// offset 0; step 1; as many steps as fit inside the parent; axes visited
/// from last (fastest) to first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowConfig {
    pub size: Option<Vec<usize>>,
    pub offset: Option<Vec<usize>>,
    pub step: Option<Vec<usize>>,
    pub num_steps: Option<Vec<usize>>,
    /// Axis visitation order; `order[0]` advances fastest.
    pub order: Option<Vec<usize>>,
    /// Deep-copy every produced patch into its own contiguous buffer.
    pub deep_copy: bool,
}

impl WindowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, size: &[usize]) -> Self {
        self.size = Some(size.to_vec());
        self
    }

    pub fn offset(mut self, offset: &[usize]) -> Self {
        self.offset = Some(offset.to_vec());
        self
    }

    pub fn step(mut self, step: &[usize]) -> Self {
        self.step = Some(step.to_vec());
        self
    }

    pub fn num_steps(mut self, num_steps: &[usize]) -> Self {
        self.num_steps = Some(num_steps.to_vec());
        self
    }

    pub fn order(mut self, order: &[usize]) -> Self {
        self.order = Some(order.to_vec());
        self
    }

    pub fn deep_copy(mut self, deep_copy: bool) -> Self {
        self.deep_copy = deep_copy;
        self
    }
}

fn invalid(msg: String) -> StridedError {
    StridedError::InvalidWindow(msg)
}

fn take_or(
    field: &Option<Vec<usize>>,
    name: &str,
    rank: usize,
    default: Vec<usize>,
) -> Result<Vec<usize>> {
    match field {
        Some(v) if v.len() != rank => Err(invalid(format!(
            "{name} has {} entries for a rank-{rank} matrix",
            v.len()
        ))),
        Some(v) => Ok(v.clone()),
        None => Ok(default),
    }
}

/// Cursor producing sub-views of a borrowed parent matrix.
///
/// The window never wraps or pads: every configuration is checked at
/// construction so that no patch leaves the parent. Advancing past the last
/// patch leaves the window equal to [`end`](Self::end).
#[derive(Debug)]
pub struct SlidingWindow<'m, T> {
    parent: &'m Matrix<T>,
    size: Vec<usize>,
    offset: Vec<usize>,
    step: Vec<usize>,
    num_steps: Vec<usize>,
    order: Vec<usize>,
    deep_copy: bool,
    coords: Vec<usize>,
    step_index: Vec<usize>,
    raw_pos: usize,
    finished: bool,
}

impl<T> Clone for SlidingWindow<'_, T> {
    fn clone(&self) -> Self {
        Self {
            parent: self.parent,
            size: self.size.clone(),
            offset: self.offset.clone(),
            step: self.step.clone(),
            num_steps: self.num_steps.clone(),
            order: self.order.clone(),
            deep_copy: self.deep_copy,
            coords: self.coords.clone(),
            step_index: self.step_index.clone(),
            raw_pos: self.raw_pos,
            finished: self.finished,
        }
    }
}

impl<'m, T> SlidingWindow<'m, T> {
    pub fn new(parent: &'m Matrix<T>, config: &WindowConfig) -> Result<Self> {
        let rank = parent.num_dim();
        let dims = parent.dims();

        let mut default_size = dims.to_vec();
        if let Some(first) = default_size.first_mut() {
            *first = 1;
        }
        let size = take_or(&config.size, "size", rank, default_size)?;
        let offset = take_or(&config.offset, "offset", rank, vec![0; rank])?;
        let step = take_or(&config.step, "step", rank, vec![1; rank])?;
        let order = take_or(&config.order, "order", rank, (0..rank).rev().collect())?;

        let mut seen = vec![false; rank];
        for &axis in &order {
            if axis >= rank || std::mem::replace(&mut seen[axis], true) {
                return Err(invalid(format!("order {order:?} is not a permutation")));
            }
        }
        for axis in 0..rank {
            if size[axis] == 0 || step[axis] == 0 {
                return Err(invalid(format!("axis {axis}: size and step must be positive")));
            }
            if offset[axis].checked_add(size[axis]).map_or(true, |end| end > dims[axis]) {
                return Err(invalid(format!(
                    "axis {axis}: window {} at offset {} exceeds extent {}",
                    size[axis], offset[axis], dims[axis]
                )));
            }
        }

        // offset + size <= dims holds on every axis here
        let fitting: Vec<usize> = (0..rank)
            .map(|a| (dims[a] - offset[a] - size[a]) / step[a] + 1)
            .collect();
        let num_steps = take_or(&config.num_steps, "num_steps", rank, fitting)?;
        for axis in 0..rank {
            let n = num_steps[axis];
            let reach = n
                .checked_sub(1)
                .and_then(|k| k.checked_mul(step[axis]))
                .and_then(|r| r.checked_add(offset[axis]))
                .and_then(|r| r.checked_add(size[axis]));
            if reach.map_or(true, |end| end > dims[axis]) {
                return Err(invalid(format!(
                    "axis {axis}: {n} steps of {} exceed extent {}",
                    step[axis], dims[axis]
                )));
            }
        }

        let mut window = Self {
            parent,
            coords: offset.clone(),
            step_index: vec![0; rank],
            size,
            offset,
            step,
            num_steps,
            order,
            deep_copy: config.deep_copy,
            raw_pos: 0,
            finished: false,
        };
        window.raw_pos = window.compute_raw_pos();
        Ok(window)
    }

    fn compute_raw_pos(&self) -> usize {
        let mut pos = self.parent.offset() as isize;
        for (&c, &s) in self.coords.iter().zip(self.parent.strides()) {
            pos += c as isize * s;
        }
        pos as usize
    }

    /// Move to the next window position.
    pub fn advance(&mut self) {
        if self.finished {
            return;
        }
        for &axis in &self.order {
            self.step_index[axis] += 1;
            if self.step_index[axis] < self.num_steps[axis] {
                self.coords[axis] += self.step[axis];
                self.raw_pos = self.compute_raw_pos();
                return;
            }
            self.step_index[axis] = 0;
            self.coords[axis] = self.offset[axis];
        }
        self.set_end();
    }

    fn set_end(&mut self) {
        self.finished = true;
        self.raw_pos = self.parent.last_raw_pos() + 1;
    }

    /// The canonical end position of this window.
    pub fn end(&self) -> Self {
        let mut end = self.clone();
        end.coords.clone_from(&end.offset);
        end.step_index.iter_mut().for_each(|s| *s = 0);
        end.set_end();
        end
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.finished
    }

    /// Raw parent position of the current patch's first element.
    #[inline]
    pub fn raw_pos(&self) -> usize {
        self.raw_pos
    }

    /// Parent coordinates of the current patch's first element.
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    pub fn window_size(&self) -> &[usize] {
        &self.size
    }

    /// Total number of patches the window produces.
    pub fn num_windows(&self) -> usize {
        self.num_steps.iter().product()
    }

    pub fn parent(&self) -> &'m Matrix<T> {
        self.parent
    }
}

impl<T: Clone> SlidingWindow<'_, T> {
    /// Sub-view (or deep copy) at the current position.
    pub fn current(&self) -> Result<Matrix<T>> {
        if self.finished {
            return Err(StridedError::OutOfRange {
                axis: 0,
                index: self.num_windows(),
                size: self.num_windows(),
            });
        }
        self.parent.sub_view(&self.coords, &self.size, self.deep_copy)
    }
}

impl<T> PartialEq for SlidingWindow<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.parent, other.parent)
            && self.raw_pos == other.raw_pos
            && self.finished == other.finished
    }
}

impl<T: Clone> Iterator for SlidingWindow<'_, T> {
    type Item = Result<Matrix<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let patch = self.current();
        self.advance();
        Some(patch)
    }
}

impl<T: Clone> Matrix<T> {
    /// Sliding window over this matrix.
    pub fn sliding_window(&self, config: &WindowConfig) -> Result<SlidingWindow<'_, T>> {
        SlidingWindow::new(self, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MajorOrder;

    fn arange(dims: &[usize]) -> Matrix<f64> {
        let n: usize = dims.iter().product();
        Matrix::from_vec(dims, MajorOrder::RowMajor, (0..n).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn test_default_window_yields_rows() {
        let m = arange(&[3, 4]);
        let rows: Vec<Vec<f64>> = m
            .sliding_window(&WindowConfig::new())
            .unwrap()
            .map(|w| w.unwrap().to_vec().unwrap())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0, 7.0],
                vec![8.0, 9.0, 10.0, 11.0]
            ]
        );
    }

    #[test]
    fn test_window_count_per_axis() {
        let m = arange(&[7]);
        let w = m.sliding_window(&WindowConfig::new().size(&[3]).step(&[2])).unwrap();
        // floor((7 - 3) / 2) + 1
        assert_eq!(w.num_windows(), 3);
        let starts: Vec<f64> = w.map(|p| p.unwrap().get(&[0]).unwrap()).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_order_controls_fastest_axis() {
        let m = arange(&[2, 2]);
        let config = WindowConfig::new().size(&[1, 1]);
        let default_order: Vec<f64> = m
            .sliding_window(&config)
            .unwrap()
            .map(|p| p.unwrap().get(&[0, 0]).unwrap())
            .collect();
        assert_eq!(default_order, vec![0.0, 1.0, 2.0, 3.0]);
        let axis0_first: Vec<f64> = m
            .sliding_window(&config.order(&[0, 1]))
            .unwrap()
            .map(|p| p.unwrap().get(&[0, 0]).unwrap())
            .collect();
        assert_eq!(axis0_first, vec![0.0, 2.0, 1.0, 3.0]);
    }

    #[test]
    fn test_patches_alias_parent_unless_deep() {
        let m = arange(&[2, 3]);
        let mut w = m.sliding_window(&WindowConfig::new()).unwrap();
        w.current().unwrap().set(&[0, 0], 50.0).unwrap();
        assert_eq!(m.get(&[0, 0]).unwrap(), 50.0);

        let deep = m.sliding_window(&WindowConfig::new().deep_copy(true)).unwrap();
        let patch = deep.current().unwrap();
        assert!(!patch.shares_block(&m));
        patch.set(&[0, 0], -1.0).unwrap();
        assert_eq!(m.get(&[0, 0]).unwrap(), 50.0);

        w.advance();
        assert_eq!(w.raw_pos(), 3);
        assert_eq!(w.coords(), &[1, 0]);
    }

    #[test]
    fn test_exhaustion_equals_end() {
        let m = arange(&[4]);
        let mut w = m.sliding_window(&WindowConfig::new().size(&[2])).unwrap();
        let end = w.end();
        for _ in 0..3 {
            assert!(!w.is_end());
            w.advance();
        }
        assert_eq!(w, end);
        w.advance();
        assert_eq!(w, end);
        assert!(w.current().is_err());
        assert!(w.next().is_none());
    }

    #[test]
    fn test_invalid_configs() {
        let m = arange(&[3, 4]);
        let cases = [
            WindowConfig::new().size(&[4, 1]),
            WindowConfig::new().size(&[1]),
            WindowConfig::new().step(&[0, 1]),
            WindowConfig::new().order(&[0, 0]),
            WindowConfig::new().size(&[2, 2]).num_steps(&[3, 1]),
            WindowConfig::new().offset(&[2, 0]).size(&[2, 1]),
            WindowConfig::new()
                .size(&[1, 1])
                .step(&[2, 1])
                .num_steps(&[usize::MAX, 1]),
            WindowConfig::new()
                .size(&[1, 1])
                .step(&[1, usize::MAX])
                .num_steps(&[1, 3]),
            WindowConfig::new().size(&[1, 1]).offset(&[usize::MAX, 0]),
        ];
        for config in &cases {
            assert!(matches!(
                SlidingWindow::new(&m, config),
                Err(StridedError::InvalidWindow(_))
            ));
        }
    }

    #[test]
    fn test_window_equality_needs_same_parent() {
        let a = arange(&[3]);
        let b = arange(&[3]);
        let wa = a.sliding_window(&WindowConfig::new()).unwrap();
        let wb = b.sliding_window(&WindowConfig::new()).unwrap();
        assert_ne!(wa, wb);
        assert_eq!(wa, wa.clone());
    }
}
