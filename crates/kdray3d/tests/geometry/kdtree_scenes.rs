use crate::triangle_soup::TriangleSoup;
use kdray3d::math::{Point, Real, Vector};
use kdray3d::partitioning::{KdBuildOptions, KdPrimitiveSet, KdTree};
use kdray3d::query::Ray;

// Makes sure the builder gives each triangle its own leaf.
const EXPENSIVE_INTERSECTION_COST: Real = 1.0e7;

/*
 *
 * 1       x     x----x
 *       / |     |   /
 *      /  |     |  /
 *     /   |     | /
 * 0  x----x     x
 *
 *   -2   -1     1    2
 */
fn two_halves() -> TriangleSoup {
    let mut soup = TriangleSoup::new(vec![
        [
            Point::new(-2.0, 0.0, 0.0),
            Point::new(-1.0, 1.0, 0.0),
            Point::new(-1.0, 0.0, 0.0),
        ],
        [
            Point::new(1.0, 0.0, 0.0),
            Point::new(1.0, 1.0, 0.0),
            Point::new(2.0, 1.0, 0.0),
        ],
    ]);
    soup.cost = EXPENSIVE_INTERSECTION_COST;
    soup
}

fn nearest(tree: &KdTree, soup: &TriangleSoup, origin: Point<Real>, dir: Vector<Real>) -> Option<u32> {
    let ray = Ray::new(origin, dir);
    tree.cast_ray_on(soup, &ray, Real::MAX)
        .map(|hit| hit.primitive)
}

#[test]
fn two_halves_scene() {
    let soup = two_halves();
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());
    tree.assert_well_formed();
    // The scene lies in the plane `z = 0`.
    assert_eq!(tree.root_aabb().extents().z, 0.0);

    let down = -Vector::z();
    assert_eq!(nearest(&tree, &soup, Point::new(-1.25, 0.5, 1.0), down), Some(0));
    assert_eq!(nearest(&tree, &soup, Point::new(1.25, 0.5, 1.0), down), Some(1));
    // The empty space between the triangles.
    assert_eq!(nearest(&tree, &soup, Point::new(0.0, 0.5, 1.0), down), None);
    assert_eq!(nearest(&tree, &soup, Point::new(0.6, 0.6, 1.0), down), None);
}

#[test]
fn overlapping_triangles_scene() {
    let mut soup = TriangleSoup::new(vec![
        [
            Point::new(0.0, 0.0, -1.0),
            Point::new(1.0, 0.0, -1.0),
            Point::new(1.0, 1.0, 0.0),
        ],
        [
            Point::new(0.0, 0.0, 0.0),
            Point::new(1.0, 0.0, 1.0),
            Point::new(1.0, 1.0, 1.0),
        ],
        [
            Point::new(0.0, 0.0, 3.0),
            Point::new(1.0, 0.0, 3.0),
            Point::new(1.0, 1.0, 2.0),
        ],
    ]);
    soup.cost = EXPENSIVE_INTERSECTION_COST;

    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());
    tree.assert_well_formed();
    tree.assert_primitives_contained(0..3, |i| soup.aabb(i));

    // From top to bottom, starting between the second and third triangles.
    let ray = Ray::new(Point::new(0.75, 0.5, 2.0), -Vector::z());
    let hit = tree.cast_ray_on(&soup, &ray, Real::MAX).unwrap();
    assert_eq!(hit.primitive, 1);
    approx::assert_relative_eq!(hit.time_of_impact, 1.25, epsilon = 1.0e-5);

    // From bottom to top.
    let ray = Ray::new(Point::new(0.75, 0.5, -2.0), Vector::z());
    let hit = tree.cast_ray_on(&soup, &ray, Real::MAX).unwrap();
    assert_eq!(hit.primitive, 0);
    approx::assert_relative_eq!(hit.time_of_impact, 1.5, epsilon = 1.0e-5);
    let [u, v] = hit.payload;
    assert!(u > 0.0 && v > 0.0);

    assert_eq!(nearest(&tree, &soup, Point::new(0.0, 0.5, 1.0), Vector::z()), None);
    assert_eq!(nearest(&tree, &soup, Point::new(5.0, 5.0, 1.0), Vector::z()), None);
}

#[test]
fn single_intersection() {
    let soup = two_halves();
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());

    let ray = Ray::new(Point::new(-1.25, 0.5, 1.0), -Vector::z());
    let hit = tree.cast_ray_on(&soup, &ray, Real::MAX).unwrap();
    assert_eq!(hit.primitive, 0);
    approx::assert_relative_eq!(hit.time_of_impact, 1.0, epsilon = 1.0e-5);

    let any = tree.any_hit_on(&soup, &ray, Real::MAX).unwrap();
    assert_eq!(any.primitive, 0);
    // The triangle is farther than the maximum distance.
    assert!(tree.any_hit_on(&soup, &ray, 0.5).is_none());
    assert!(tree.cast_ray_on(&soup, &ray, 0.5).is_none());
}

#[test]
fn coincident_triangles_are_both_reachable() {
    let triangle = [
        Point::new(0.0, 0.0, 0.0),
        Point::new(1.0, 0.0, 0.0),
        Point::new(0.0, 1.0, 0.0),
    ];
    let soup = TriangleSoup::new(vec![triangle, triangle]);
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());
    tree.assert_well_formed();

    let ray = Ray::new(Point::new(0.25, 0.25, 1.0), -Vector::z());
    let hit = tree.cast_ray_on(&soup, &ray, Real::MAX).unwrap();
    assert!(hit.primitive == 0 || hit.primitive == 1);

    let other = tree
        .cast_ray_with_filter(
            &ray,
            Real::MAX,
            |ray, i| soup.cast_ray(ray, i),
            |i| i == hit.primitive,
        )
        .unwrap();
    assert_eq!(other.primitive, 1 - hit.primitive);
    assert_eq!(other.time_of_impact, hit.time_of_impact);
}

#[test]
fn queries_are_idempotent() {
    let mut rng = oorandom::Rand32::new(3);
    let soup = TriangleSoup::random(&mut rng, 300, 20.0, 2.0);
    let tree = KdTree::from_primitives(&soup, &KdBuildOptions::default());

    for _ in 0..100 {
        let origin = Point::new(rng.rand_float(), rng.rand_float(), -1.0) * 20.0;
        let target = Point::new(rng.rand_float(), rng.rand_float(), rng.rand_float()) * 20.0;
        let ray = Ray::new(origin, target - origin);

        let first = tree.cast_ray_on(&soup, &ray, Real::MAX);
        for _ in 0..3 {
            assert_eq!(tree.cast_ray_on(&soup, &ray, Real::MAX), first);
        }
    }
}
