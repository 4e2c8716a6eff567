use super::{KdBuildOptions, KdNode, KdRayHit, KdTree};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::Real;
use crate::query::Ray;

/// A set of primitives a [`KdTree`] can be built on and queried against.
///
/// Primitives are identified by the indices `0..self.primitive_count()`. This is the
/// trait-based counterpart of the closures taken by [`KdTree::build`] and
/// [`KdTree::cast_ray`].
pub trait KdPrimitiveSet {
    /// Data returned by a successful hit test.
    type Hit;

    /// The number of primitives of this set.
    fn primitive_count(&self) -> u32;

    /// The bounding box of a primitive.
    fn aabb(&self, primitive: u32) -> Aabb;

    /// The relative cost of intersecting a primitive, or of intersecting any primitive if
    /// `primitive` is `None`.
    fn cost(&self, _primitive: Option<u32>) -> Real {
        1.0
    }

    /// Intersects a ray with a primitive.
    ///
    /// Returns the parameter of the hit along the ray and the associated data.
    fn cast_ray(&self, ray: &Ray, primitive: u32) -> Option<(Real, Self::Hit)>;
}

impl KdTree {
    /// Builds a kd-tree over all the primitives of `set`.
    pub fn from_primitives<S: KdPrimitiveSet + ?Sized>(set: &S, options: &KdBuildOptions) -> Self {
        Self::build(
            0..set.primitive_count(),
            |i| set.aabb(i),
            |i| set.cost(i),
            options,
        )
    }

    /// Finds the nearest primitive of `set` hit by a ray.
    ///
    /// `self` must have been built on `set`.
    pub fn cast_ray_on<S: KdPrimitiveSet + ?Sized>(
        &self,
        set: &S,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<KdRayHit<S::Hit>> {
        self.cast_ray(ray, max_time_of_impact, |ray, i| set.cast_ray(ray, i))
    }

    /// Finds any primitive of `set` hit by a ray.
    ///
    /// `self` must have been built on `set`.
    pub fn any_hit_on<S: KdPrimitiveSet + ?Sized>(
        &self,
        set: &S,
        ray: &Ray,
        max_time_of_impact: Real,
    ) -> Option<KdRayHit<S::Hit>> {
        self.any_hit(ray, max_time_of_impact, |ray, i| set.cast_ray(ray, i))
    }

    /// Iterates through the primitives of the leaves with an AABB intersecting the given `aabb`.
    ///
    /// A primitive listed by several such leaves is yielded once per leaf.
    pub fn intersect_aabb<'a>(&'a self, aabb: &'a Aabb) -> impl Iterator<Item = u32> + 'a {
        self.leaves_with(move |node: &KdNode| node.aabb().intersects(aabb))
            .flat_map(|(_, _, primitives)| primitives.iter().copied())
    }

    /// Finds the nearest hit of every ray of `rays`, in parallel.
    ///
    /// This is equivalent to calling [`KdTree::cast_ray`] on every ray.
    #[cfg(feature = "parallel")]
    pub fn cast_rays_par<H: Send>(
        &self,
        rays: &[Ray],
        max_time_of_impact: Real,
        hit_test: impl Fn(&Ray, u32) -> Option<(Real, H)> + Sync,
    ) -> Vec<Option<KdRayHit<H>>> {
        use rayon::prelude::*;

        rays.par_iter()
            .map(|ray| self.cast_ray(ray, max_time_of_impact, &hit_test))
            .collect()
    }
}
