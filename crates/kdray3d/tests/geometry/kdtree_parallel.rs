use crate::triangle_soup::TriangleSoup;
use kdray3d::math::{Point, Real};
use kdray3d::partitioning::{KdBuildOptions, KdPrimitiveSet, KdTree};
use kdray3d::query::Ray;

#[test]
fn parallel_ray_batches_match_sequential_queries() {
    let mut rng = oorandom::Rand32::new(42);
    let soup = TriangleSoup::random(&mut rng, 1000, 20.0, 1.0);
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());

    let rays: Vec<_> = (0..4000)
        .map(|_| {
            let origin = Point::new(rng.rand_float(), -0.5, rng.rand_float()) * 20.0;
            let target = Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()) * 20.0;
            Ray::new(origin, target - origin)
        })
        .collect();

    let parallel = tree.cast_rays_par(&rays, Real::MAX, |ray, i| soup.cast_ray(ray, i));
    assert_eq!(parallel.len(), rays.len());

    for (ray, hit) in rays.iter().zip(parallel) {
        assert_eq!(hit, tree.cast_ray_on(&soup, ray, Real::MAX));
    }
}
