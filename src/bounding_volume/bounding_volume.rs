use crate::math::Real;

/// Volumes that can be combined and compared while building and validating a spatial
/// partition.
pub trait BoundingVolume {
    /// Do `self` and `other` share at least one point?
    fn intersects(&self, other: &Self) -> bool;

    /// Is `other` entirely inside of `self`? Boundaries may touch.
    fn contains(&self, other: &Self) -> bool;

    /// Grows `self` so it also encloses `other`.
    fn merge(&mut self, other: &Self);

    /// The smallest volume enclosing both `self` and `other`.
    fn merged(&self, other: &Self) -> Self;

    /// Thickens the axes along which `self` is flat (within `eps`) by `eps` on both sides.
    ///
    /// Axes with a non-negligible extent are left unchanged.
    fn inflate(&mut self, eps: Real);
}
