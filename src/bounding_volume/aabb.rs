//! Axis Aligned Bounding Box.

use crate::bounding_volume::BoundingVolume;
use crate::math::{Point, Real, Vector, DIM};
use na;
use num::Bounded;

/// An Axis-Aligned Bounding Box (AABB).
///
/// An AABB is defined by its minimum and maximum corners. It is the bounding volume used
/// by the kd-tree both for the cells it subdivides during construction and for the node
/// bounds it tests rays against during traversal.
///
/// # Structure
///
/// - **mins**: The point with the smallest coordinates on each axis.
/// - **maxs**: The point with the largest coordinates on each axis.
/// - **Invariant**: `mins.x ≤ maxs.x`, `mins.y ≤ maxs.y` and `mins.z ≤ maxs.z`.
///
/// A box violating the invariant on any axis is *invalid* (empty). This is the state
/// returned by [`Aabb::new_invalid`] and by `Default`, and it is the neutral element of
/// [`BoundingVolume::merge`].
///
/// # Example
///
/// ```rust
/// use kdray3d::bounding_volume::{Aabb, BoundingVolume};
/// use kdray3d::na::Point3;
///
/// let mut aabb = Aabb::new_invalid();
/// aabb.take_point(Point3::new(0.0, 0.0, 0.0));
/// aabb.take_point(Point3::new(1.0, 2.0, 3.0));
///
/// assert!(aabb.is_valid());
/// assert_eq!(aabb.surface_area(), 2.0 * (2.0 + 3.0 + 6.0));
///
/// let (left, right) = aabb.split_at(2, 1.0);
/// assert_eq!(left.maxs.z, 1.0);
/// assert_eq!(right.mins.z, 1.0);
/// assert!(aabb.contains(&left.merged(&right)));
/// ```
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(C)]
pub struct Aabb {
    /// The point with minimum coordinates.
    pub mins: Point<Real>,
    /// The point with maximum coordinates.
    pub maxs: Point<Real>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new_invalid()
    }
}

impl Aabb {
    /// Creates a new Aabb.
    ///
    /// # Arguments:
    ///   * `mins` - position of the point with the smallest coordinates.
    ///   * `maxs` - position of the point with the highest coordinates. Each component of `mins`
    ///     must be smaller than the related components of `maxs`.
    #[inline]
    pub fn new(mins: Point<Real>, maxs: Point<Real>) -> Aabb {
        Aabb { mins, maxs }
    }

    /// Creates an invalid `Aabb` with `mins` components set to `Real::max_values` and `maxs`
    /// components set to `-Real::max_values`.
    ///
    /// This is often used as the initial values of some `Aabb` merging algorithms.
    #[inline]
    pub fn new_invalid() -> Self {
        Self::new(
            Vector::repeat(Real::max_value()).into(),
            Vector::repeat(-Real::max_value()).into(),
        )
    }

    /// Creates a new `Aabb` from its center and its half-extents.
    #[inline]
    pub fn from_half_extents(center: Point<Real>, half_extents: Vector<Real>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Creates a new `Aabb` enclosing all the given points.
    ///
    /// Returns an invalid `Aabb` if `pts` is empty.
    pub fn from_points<I>(pts: I) -> Self
    where
        I: IntoIterator<Item = Point<Real>>,
    {
        let mut result = Self::new_invalid();
        for pt in pts {
            result.take_point(pt);
        }
        result
    }

    /// The center of this `Aabb`.
    #[inline]
    pub fn center(&self) -> Point<Real> {
        na::center(&self.mins, &self.maxs)
    }

    /// The half extents of this `Aabb`.
    #[inline]
    pub fn half_extents(&self) -> Vector<Real> {
        (self.maxs - self.mins) * 0.5
    }

    /// The extents of this `Aabb`.
    #[inline]
    pub fn extents(&self) -> Vector<Real> {
        self.maxs - self.mins
    }

    /// The length of this `Aabb` along the given axis.
    #[inline]
    pub fn edge(&self, axis: usize) -> Real {
        self.maxs[axis] - self.mins[axis]
    }

    /// The index of the axis along which this `Aabb` is the largest.
    ///
    /// Ties are resolved in favor of the smallest axis index.
    pub fn longest_axis(&self) -> usize {
        self.extents().imax()
    }

    /// Does this `Aabb` satisfy `mins <= maxs` on every axis?
    ///
    /// A box with a `NaN` coordinate is never valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..DIM).all(|i| self.mins[i] <= self.maxs[i])
    }

    /// Is this `Aabb` degenerate, i.e., flat (within `eps`) along at least one axis?
    #[inline]
    pub fn is_planar(&self, eps: Real) -> bool {
        (0..DIM).any(|i| self.edge(i) <= eps)
    }

    /// The volume of this `Aabb`.
    ///
    /// Returns zero for an invalid `Aabb`.
    #[inline]
    pub fn volume(&self) -> Real {
        if !self.is_valid() {
            return 0.0;
        }

        let extents = self.extents();
        extents.x * extents.y * extents.z
    }

    /// The total area of the six faces of this `Aabb`.
    ///
    /// Returns zero for an invalid `Aabb`.
    #[inline]
    pub fn surface_area(&self) -> Real {
        if !self.is_valid() {
            return 0.0;
        }

        let extents = self.extents();
        2.0 * (extents.x * (extents.y + extents.z) + extents.y * extents.z)
    }

    /// Enlarges this `Aabb` so it also contains the point `pt`.
    #[inline]
    pub fn take_point(&mut self, pt: Point<Real>) {
        self.mins = self.mins.coords.inf(&pt.coords).into();
        self.maxs = self.maxs.coords.sup(&pt.coords).into();
    }

    /// Clamps this `Aabb` into `other`, in-place.
    ///
    /// Unlike [`Aabb::intersection`], this never fails: both corners are projected onto
    /// `other`, so the result is degenerate (but still valid) along the axes where the two
    /// boxes are disjoint.
    #[inline]
    pub fn clip_by(&mut self, other: &Aabb) {
        self.mins = self.mins.sup(&other.mins).inf(&other.maxs);
        self.maxs = self.maxs.sup(&other.mins).inf(&other.maxs);
    }

    /// Returns a copy of this `Aabb` clamped into `other`.
    ///
    /// See [`Aabb::clip_by`].
    #[inline]
    pub fn clipped_by(&self, other: &Aabb) -> Aabb {
        let mut result = *self;
        result.clip_by(other);
        result
    }

    /// Splits this `Aabb` by the plane orthogonal to `axis` at the given position.
    ///
    /// Returns the `(left, right)` pair where `left.maxs[axis] == value` and
    /// `right.mins[axis] == value`. The position is not required to lie inside of
    /// `self`, in which case one of the two halves is invalid.
    #[inline]
    pub fn split_at(&self, axis: usize, value: Real) -> (Aabb, Aabb) {
        let mut left = *self;
        let mut right = *self;
        left.maxs[axis] = value;
        right.mins[axis] = value;
        (left, right)
    }

    /// Computes the intersection of this `Aabb` and another one.
    ///
    /// Returns `None` if the two boxes are disjoint.
    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        let result = Aabb {
            mins: Point::from(self.mins.coords.sup(&other.mins.coords)),
            maxs: Point::from(self.maxs.coords.inf(&other.maxs.coords)),
        };

        if result.is_valid() {
            Some(result)
        } else {
            None
        }
    }

    /// Tests if this `Aabb` contains the given point.
    #[inline]
    pub fn contains_local_point(&self, point: &Point<Real>) -> bool {
        for i in 0..DIM {
            if point[i] < self.mins[i] || point[i] > self.maxs[i] {
                return false;
            }
        }

        true
    }

    /// Does this `Aabb` only contain finite coordinates?
    #[inline]
    pub fn is_finite(&self) -> bool {
        (0..DIM).all(|i| self.mins[i].is_finite() && self.maxs[i].is_finite())
    }
}

impl BoundingVolume for Aabb {
    #[inline]
    fn intersects(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.maxs) && na::partial_ge(&self.maxs, &other.mins)
    }

    #[inline]
    fn contains(&self, other: &Aabb) -> bool {
        na::partial_le(&self.mins, &other.mins) && na::partial_ge(&self.maxs, &other.maxs)
    }

    #[inline]
    fn merge(&mut self, other: &Aabb) {
        self.mins = self.mins.inf(&other.mins);
        self.maxs = self.maxs.sup(&other.maxs);
    }

    #[inline]
    fn merged(&self, other: &Aabb) -> Aabb {
        Aabb {
            mins: self.mins.inf(&other.mins),
            maxs: self.maxs.sup(&other.maxs),
        }
    }

    #[inline]
    fn inflate(&mut self, eps: Real) {
        assert!(eps >= 0.0, "The inflation margin must be positive.");
        for i in 0..DIM {
            if self.edge(i).abs() <= eps {
                self.mins[i] -= eps;
                self.maxs[i] += eps;
            }
        }
    }
}
