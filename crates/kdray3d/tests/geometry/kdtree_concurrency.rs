use crate::triangle_soup::TriangleSoup;
use kdray3d::math::{Point, Real};
use kdray3d::partitioning::{KdBuildOptions, KdRayHit, KdTree, KdTreeHandle};
use kdray3d::query::Ray;
use std::sync::Arc;

fn rays(seed: u64, len: usize) -> Vec<Ray> {
    let mut rng = oorandom::Rand32::new(seed);
    (0..len)
        .map(|_| {
            let origin = Point::new(rng.rand_float(), rng.rand_float(), -0.5) * 20.0;
            let target = Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()) * 20.0;
            Ray::new(origin, target - origin)
        })
        .collect()
}

fn cast_all(tree: &KdTree, soup: &TriangleSoup, rays: &[Ray]) -> Vec<Option<KdRayHit<[Real; 2]>>> {
    rays.iter()
        .map(|ray| tree.cast_ray_on(soup, ray, Real::MAX))
        .collect()
}

#[test]
fn concurrent_queries_agree_with_sequential_ones() {
    let mut rng = oorandom::Rand32::new(42);
    let soup = TriangleSoup::random(&mut rng, 500, 20.0, 2.0);
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());
    let rays = rays(1, 2000);
    let expected = cast_all(&tree, &soup, &rays);

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| cast_all(&tree, &soup, &rays)))
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}

#[test]
fn publication_does_not_disturb_readers() {
    let mut rng = oorandom::Rand32::new(42);
    let old_soup = TriangleSoup::random(&mut rng, 300, 20.0, 2.0);
    let new_soup = TriangleSoup::random(&mut rng, 300, 20.0, 2.0);
    let options = KdBuildOptions::default();

    let handle = KdTreeHandle::from_tree(KdTree::from_primitives(&old_soup, &options));
    let rays = rays(2, 500);
    let expected_old = cast_all(&handle.load(), &old_soup, &rays);

    std::thread::scope(|s| {
        // A render thread holding a snapshot of the old scene.
        let snapshot = handle.load();
        let reader = s.spawn(|| {
            let snapshot = snapshot;
            (0..5)
                .map(|_| cast_all(&snapshot, &old_soup, &rays))
                .collect::<Vec<_>>()
        });

        let published = handle.rebuild_with(|_| KdTree::from_primitives(&new_soup, &options));
        assert!(Arc::ptr_eq(&published, &handle.load()));

        for results in reader.join().unwrap() {
            assert_eq!(results, expected_old);
        }
    });

    let current = handle.load();
    current.assert_well_formed();
    assert_eq!(
        cast_all(&current, &new_soup, &rays),
        cast_all(&KdTree::from_primitives(&new_soup, &options), &new_soup, &rays)
    );
}
