use std::mem;

use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector, DIM};
use crate::query::Ray;
use num::Zero;

/// The parametric interval along which a ray overlaps an [`Aabb`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlabRange {
    /// The parameter at which the ray enters the box (clamped to zero).
    pub entry: Real,
    /// The parameter at which the ray exits the box (clamped to the query's maximum).
    pub exit: Real,
}

impl Aabb {
    /// Computes the parametric range along which `ray` overlaps this box.
    ///
    /// `inv_dir` must be `ray.inv_dir()`. It is taken as an argument so that traversals
    /// compute it only once per ray. The range is clamped to `[0, max_time_of_impact]`
    /// and `None` is returned if it is empty (`exit < entry`).
    ///
    /// Axes along which the ray direction is zero (or so small that its inverse isn't
    /// finite) don't constrain the range: the ray either lies within the slab for every
    /// `t`, or never enters it. Origins lying exactly on a slab plane count as inside.
    /// An invalid `Aabb` is never hit.
    pub fn intersects_range(
        &self,
        ray: &Ray,
        inv_dir: &Vector<Real>,
        max_time_of_impact: Real,
    ) -> Option<SlabRange> {
        if !self.is_valid() {
            return None;
        }

        let mut entry: Real = 0.0;
        let mut exit: Real = max_time_of_impact;

        for i in 0usize..DIM {
            if ray.dir[i].is_zero() || !inv_dir[i].is_finite() {
                if ray.origin[i] < self.mins[i] || ray.origin[i] > self.maxs[i] {
                    return None;
                }
            } else {
                let mut near = (self.mins[i] - ray.origin[i]) * inv_dir[i];
                let mut far = (self.maxs[i] - ray.origin[i]) * inv_dir[i];

                if near > far {
                    mem::swap(&mut near, &mut far);
                }

                entry = entry.max(near);
                exit = exit.min(far);

                if exit < entry {
                    // This covers the case where the box is behind the origin because
                    // entry is initialized at zero.
                    return None;
                }
            }
        }

        Some(SlabRange { entry, exit })
    }

    /// Does `ray` hit this box with a parameter in `[0, max_time_of_impact]`?
    ///
    /// Convenience over [`Aabb::intersects_range`] for one-off tests.
    #[inline]
    pub fn intersects_local_ray(&self, ray: &Ray, max_time_of_impact: Real) -> bool {
        self.intersects_range(ray, &ray.inv_dir(), max_time_of_impact)
            .is_some()
    }
}
