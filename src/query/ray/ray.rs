//! Structure needed to cast rays.

use crate::math::{Point, Real, Vector};

/// A ray for ray-casting queries.
///
/// A ray is a half-infinite line starting at an origin point and extending in a
/// direction. Points along the ray are computed as `origin + dir * t` for `t ≥ 0`.
///
/// The direction does not need to be normalized, but every distance reported by the
/// kd-tree queries (and expected from the caller's hit tests) is expressed in the
/// parameter `t`, so a normalized direction gives distances in world units.
///
/// Components of `dir` may be exactly zero: axis-aligned rays are common in renderers
/// (e.g. orthographic cameras) and are handled analytically by the slab test.
///
/// # Example
///
/// ```rust
/// use kdray3d::query::Ray;
/// use kdray3d::na::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 2.0, 0.0));
/// assert_eq!(ray.point_at(1.5), Point3::new(0.0, 3.0, 0.0));
/// assert_eq!(ray.inv_dir().y, 0.5);
/// assert!(ray.inv_dir().x.is_infinite());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[repr(C)]
pub struct Ray {
    /// Starting point of the ray.
    pub origin: Point<Real>,
    /// Direction of the ray.
    pub dir: Vector<Real>,
}

impl Ray {
    /// Creates a new ray starting from `origin` and with the direction `dir`.
    pub fn new(origin: Point<Real>, dir: Vector<Real>) -> Ray {
        Ray { origin, dir }
    }

    /// Computes the point at the given parameter on this ray.
    ///
    /// This is computed by `self.origin + self.dir * t`.
    #[inline]
    pub fn point_at(&self, t: Real) -> Point<Real> {
        self.origin + self.dir * t
    }

    /// The component-wise inverse of the direction of this ray.
    ///
    /// Zero components map to a signed infinity. Node-bound tests reuse this value
    /// for every box they visit during one query.
    #[inline]
    pub fn inv_dir(&self) -> Vector<Real> {
        self.dir.map(|d| 1.0 / d)
    }

    /// Translates this ray by the given vector. Its direction is left unchanged.
    #[inline]
    pub fn translate_by(&self, v: Vector<Real>) -> Self {
        Self::new(self.origin + v, self.dir)
    }
}
