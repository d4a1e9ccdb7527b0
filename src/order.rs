//! Axis orderings used by traversal and layout checks.

/// Axis permutation for best-span traversal: descending extent, ties broken by
/// lower axis index first. `order[0]` is the span axis.
pub(crate) fn best_span_order(dims: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..dims.len()).collect();
    order.sort_by(|&a, &b| dims[b].cmp(&dims[a]).then_with(|| a.cmp(&b)));
    order
}

/// Non-singleton axes sorted by ascending stride magnitude.
///
/// This is the innermost-first order in which a packed buffer would lay the
/// axes out, whatever the nominal major order.
pub(crate) fn stride_order(dims: &[usize], strides: &[isize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] > 1).collect();
    order.sort_by(|&a, &b| {
        strides[a]
            .unsigned_abs()
            .cmp(&strides[b].unsigned_abs())
            .then_with(|| b.cmp(&a))
    });
    order
}
