//! Scalar type bounds for matrix arithmetic and BLAS dispatch.

use std::fmt::Debug;

/// Precision tag used to route a generic element type to a CBLAS routine.
///
/// # Safety
///
/// `is_single()` may only return `true` when `Self` is exactly `f32`, and
/// `is_double()` only when `Self` is exactly `f64`. The BLAS layer
/// reinterprets buffers of `Self` as buffers of the reported type.
pub unsafe trait BlasFloat: Copy + 'static {
    /// Check if this type is single precision (f32).
    fn is_single() -> bool;
    /// Check if this type is double precision (f64).
    fn is_double() -> bool;

    /// True when some CBLAS routine accepts this type.
    #[inline]
    fn has_blas() -> bool {
        Self::is_single() || Self::is_double()
    }
}

unsafe impl BlasFloat for f32 {
    #[inline]
    fn is_single() -> bool {
        true
    }
    #[inline]
    fn is_double() -> bool {
        false
    }
}

unsafe impl BlasFloat for f64 {
    #[inline]
    fn is_single() -> bool {
        false
    }
    #[inline]
    fn is_double() -> bool {
        true
    }
}

/// Element bound for every numeric matrix operation.
///
/// `Float` supplies the transcendental functions (`ln`, `exp`, `tanh`, ...)
/// and the min/max/abs helpers used by reductions. `BlasFloat` decides whether
/// the BLAS fast path may be attempted.
pub trait MatrixScalar:
    num_traits::Float + BlasFloat + Default + Debug + Send + Sync + 'static
{
}

impl<T> MatrixScalar for T where
    T: num_traits::Float + BlasFloat + Default + Debug + Send + Sync + 'static
{
}
