extern crate nalgebra as na;

use kdray3d::bounding_volume::Aabb;
use kdray3d::math::Real;
use kdray3d::partitioning::{KdBuildOptions, KdPrimitiveSet, KdTree};
use kdray3d::query::Ray;
use na::{Point3, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};

const WIDTH: usize = 72;
const HEIGHT: usize = 32;

struct Spheres {
    centers: Vec<Point3<Real>>,
    radii: Vec<Real>,
}

impl KdPrimitiveSet for Spheres {
    /// The normal at the hit point.
    type Hit = Vector3<Real>;

    fn primitive_count(&self) -> u32 {
        self.centers.len() as u32
    }

    fn aabb(&self, primitive: u32) -> Aabb {
        let i = primitive as usize;
        Aabb::from_half_extents(self.centers[i], Vector3::repeat(self.radii[i]))
    }

    fn cast_ray(&self, ray: &Ray, primitive: u32) -> Option<(Real, Vector3<Real>)> {
        let i = primitive as usize;
        let dpos = ray.origin - self.centers[i];
        let a = ray.dir.norm_squared();
        let b = dpos.dot(&ray.dir);
        let c = dpos.norm_squared() - self.radii[i] * self.radii[i];
        let discr = b * b - a * c;

        if discr < 0.0 {
            return None;
        }

        let t = (-b - discr.sqrt()) / a;
        let t = if t < 0.0 { (-b + discr.sqrt()) / a } else { t };
        let normal = (ray.point_at(t) - self.centers[i]) / self.radii[i];
        Some((t, normal))
    }
}

fn main() {
    let mut rng = StdRng::seed_from_u64(0);
    let spheres = Spheres {
        centers: (0..2000)
            .map(|_| {
                Point3::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-5.0..5.0),
                    rng.gen_range(0.0..20.0),
                )
            })
            .collect(),
        radii: (0..2000).map(|_| rng.gen_range(0.05..0.4)).collect(),
    };

    let tree = KdTree::from_primitives(&spheres, &KdBuildOptions::default());
    println!("{:#?}", tree.stats());

    // Orthographic rays looking along `+z`.
    let light = Vector3::new(-1.0, 1.0, -1.0).normalize();
    for row in 0..HEIGHT {
        let line: String = (0..WIDTH)
            .map(|col| {
                let x = (col as Real / WIDTH as Real) * 20.0 - 10.0;
                let y = 5.0 - (row as Real / HEIGHT as Real) * 10.0;
                let ray = Ray::new(Point3::new(x, y, -1.0), Vector3::z());

                match tree.cast_ray_on(&spheres, &ray, Real::MAX) {
                    Some(hit) => {
                        let shade = hit.payload.dot(&light).max(0.0);
                        b".:-=+*#%@"[(shade * 8.0).round() as usize] as char
                    }
                    None => ' ',
                }
            })
            .collect();
        println!("{}", line);
    }

    // The tree can be cached and reloaded as long as the geometry is unchanged.
    let mut bytes = vec![];
    tree.save(&mut bytes).expect("failed to serialize the kd-tree");
    let reloaded = KdTree::load(&bytes[..], spheres.primitive_count(), |i| spheres.aabb(i))
        .expect("failed to reload the kd-tree");
    println!(
        "Serialized {} nodes in {} bytes.",
        reloaded.nodes().len(),
        bytes.len()
    );
}
