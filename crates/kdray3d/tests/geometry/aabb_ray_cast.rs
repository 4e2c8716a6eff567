use kdray3d::bounding_volume::Aabb;
use kdray3d::math::{Point, Real, Vector};
use kdray3d::query::Ray;

#[test]
fn axis_aligned_rays_match_the_analytic_intersection() {
    let aabb = Aabb::new(Point::new(-1.0, -2.0, -3.0), Point::new(1.0, 2.0, 3.0));
    let mut rng = oorandom::Rand32::new(42);

    for axis in 0..3 {
        for _ in 0..1000 {
            let mut origin = Point::new(
                rng.rand_float() * 8.0 - 4.0,
                rng.rand_float() * 8.0 - 4.0,
                rng.rand_float() * 8.0 - 4.0,
            );
            // Some origins lie exactly on the slab planes.
            if rng.rand_range(0..10) == 0 {
                let other = (axis + 1) % 3;
                origin[other] = aabb.maxs[other];
            }

            let sign = if rng.rand_range(0..2) == 0 { 1.0 } else { -1.0 };
            let mut dir = Vector::zeros();
            dir[axis] = sign;
            let ray = Ray::new(origin, dir);

            let in_slabs = (0..3)
                .filter(|i| *i != axis)
                .all(|i| origin[i] >= aabb.mins[i] && origin[i] <= aabb.maxs[i]);
            let (near, far) = if sign > 0.0 {
                (aabb.mins[axis] - origin[axis], aabb.maxs[axis] - origin[axis])
            } else {
                (origin[axis] - aabb.maxs[axis], origin[axis] - aabb.mins[axis])
            };
            let expected = (in_slabs && far >= 0.0).then(|| near.max(0.0));

            let range = aabb.intersects_range(&ray, &ray.inv_dir(), Real::MAX);
            assert_eq!(
                range.map(|range| range.entry),
                expected,
                "Unexpected slab range for {:?}.",
                ray
            );
            assert_eq!(aabb.intersects_local_ray(&ray, Real::MAX), expected.is_some());
        }
    }
}
