use super::{KdNode, KdTree, KD_TRAVERSAL_STACK_SIZE};
use crate::bounding_volume::Aabb;
use crate::math::{Real, Vector};
use crate::query::Ray;
use arrayvec::ArrayVec;
use smallvec::SmallVec;

/// The stack of nodes pending during a ray traversal, with their entry distance.
type KdTraversalStack = ArrayVec<(u32, Real), KD_TRAVERSAL_STACK_SIZE>;

/// The result of a successful ray-cast on a [`KdTree`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdRayHit<H> {
    /// The identifier of the primitive hit by the ray.
    pub primitive: u32,
    /// The parameter along the ray at which the primitive is hit.
    pub time_of_impact: Real,
    /// The data returned by the primitive hit test.
    pub payload: H,
}

/// Iterator through the leaves of a [`KdTree`], in depth-first order.
///
/// Yields `(node_id, aabb, primitives)` for every leaf reached.
pub struct KdLeaves<'a, Check: Fn(&KdNode) -> bool> {
    tree: &'a KdTree,
    stack: SmallVec<[u32; 32]>,
    check: Check,
}

impl<'a, Check: Fn(&KdNode) -> bool> KdLeaves<'a, Check> {
    fn new(tree: &'a KdTree, check: Check) -> Self {
        let mut stack = SmallVec::new();

        if let Some(root) = tree.nodes.first() {
            if check(root) {
                stack.push(0);
            }
        }

        KdLeaves { tree, stack, check }
    }
}

impl<'a, Check: Fn(&KdNode) -> bool> Iterator for KdLeaves<'a, Check> {
    type Item = (u32, &'a Aabb, &'a [u32]);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;

        loop {
            let id = self.stack.pop()?;
            let node = &tree.nodes[id as usize];

            match node.children() {
                None => return Some((id, node.aabb(), tree.leaf_primitives(node))),
                Some([left, right]) => {
                    if (self.check)(&tree.nodes[right as usize]) {
                        self.stack.push(right);
                    }
                    if (self.check)(&tree.nodes[left as usize]) {
                        self.stack.push(left);
                    }
                }
            }
        }
    }
}

fn every_node(_: &KdNode) -> bool {
    true
}

impl KdTree {
    /// Iterates through all the leaves, in depth-first order.
    ///
    /// This gives, for every primitive, the leaves it was assigned to during construction.
    pub fn leaves(&self) -> KdLeaves<'_, fn(&KdNode) -> bool> {
        KdLeaves::new(self, every_node as fn(&KdNode) -> bool)
    }

    /// Iterates through the leaves, in depth-first order, pruning sub-trees.
    ///
    /// The `check_node` closure is called on every traversed node. If it returns `false` then the
    /// node and all its descendants won't be iterated on.
    pub fn leaves_with<F: Fn(&KdNode) -> bool>(&self, check_node: F) -> KdLeaves<'_, F> {
        KdLeaves::new(self, check_node)
    }

    /// Finds the nearest primitive hit by a ray.
    ///
    /// The `hit_test` closure computes the intersection between the ray and a primitive. It
    /// returns the parameter `t` of the hit along the ray together with an arbitrary
    /// payload (typically the surface data of the hit point). Hits with a `t` outside of
    /// `[0, max_time_of_impact]` are ignored.
    ///
    /// Returns `None` if no primitive is hit, i.e., if the distance to the nearest hit is
    /// infinite. The result is the same as testing every primitive and keeping the
    /// closest one; when several hits are at the same distance, the first one found wins.
    pub fn cast_ray<H>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        hit_test: impl Fn(&Ray, u32) -> Option<(Real, H)>,
    ) -> Option<KdRayHit<H>> {
        self.cast_ray_with_filter(ray, max_time_of_impact, hit_test, |_| false)
    }

    /// Finds the nearest primitive hit by a ray, ignoring the primitives for which
    /// `ignore` returns `true`.
    ///
    /// Renderers use `ignore` to exclude the surface a secondary ray is spawned from.
    /// See [`KdTree::cast_ray`] for the other arguments.
    pub fn cast_ray_with_filter<H>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        hit_test: impl Fn(&Ray, u32) -> Option<(Real, H)>,
        ignore: impl Fn(u32) -> bool,
    ) -> Option<KdRayHit<H>> {
        let root = self.nodes.first()?;
        let inv_dir = ray.inv_dir();
        let root_range = root
            .aabb()
            .intersects_range(ray, &inv_dir, max_time_of_impact)?;

        let mut best: Option<KdRayHit<H>> = None;
        let mut stack = KdTraversalStack::new();
        stack.push((0, root_range.entry));

        while let Some((id, entry)) = stack.pop() {
            let nearest = best
                .as_ref()
                .map(|hit| hit.time_of_impact)
                .unwrap_or(max_time_of_impact);

            if best.is_some() && entry >= nearest {
                continue;
            }

            let node = &self.nodes[id as usize];
            match *node {
                KdNode::Leaf { .. } => {
                    for primitive in self.leaf_primitives(node) {
                        if ignore(*primitive) {
                            continue;
                        }

                        if let Some((toi, payload)) = hit_test(ray, *primitive) {
                            let closer = match &best {
                                Some(hit) => toi < hit.time_of_impact,
                                None => toi <= max_time_of_impact,
                            };

                            if toi >= 0.0 && closer {
                                best = Some(KdRayHit {
                                    primitive: *primitive,
                                    time_of_impact: toi,
                                    payload,
                                });
                            }
                        }
                    }
                }
                KdNode::Inner { left, right, .. } => {
                    if !self.push_children(&mut stack, ray, &inv_dir, nearest, [left, right]) {
                        return None;
                    }
                }
            }
        }

        best
    }

    /// Finds any primitive hit by a ray, not necessarily the nearest one.
    ///
    /// This is cheaper than [`KdTree::cast_ray`] since the traversal stops at the first hit,
    /// which is all occlusion (shadow) rays need. Hits with a parameter outside of
    /// `[0, max_time_of_impact]` are ignored.
    pub fn any_hit<H>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        hit_test: impl Fn(&Ray, u32) -> Option<(Real, H)>,
    ) -> Option<KdRayHit<H>> {
        self.any_hit_with_filter(ray, max_time_of_impact, hit_test, |_| false)
    }

    /// Finds any primitive hit by a ray, ignoring the primitives for which `ignore` returns
    /// `true`.
    pub fn any_hit_with_filter<H>(
        &self,
        ray: &Ray,
        max_time_of_impact: Real,
        hit_test: impl Fn(&Ray, u32) -> Option<(Real, H)>,
        ignore: impl Fn(u32) -> bool,
    ) -> Option<KdRayHit<H>> {
        let root = self.nodes.first()?;
        let inv_dir = ray.inv_dir();
        let root_range = root
            .aabb()
            .intersects_range(ray, &inv_dir, max_time_of_impact)?;

        let mut stack = KdTraversalStack::new();
        stack.push((0, root_range.entry));

        while let Some((id, _)) = stack.pop() {
            let node = &self.nodes[id as usize];
            match *node {
                KdNode::Leaf { .. } => {
                    for primitive in self.leaf_primitives(node) {
                        if ignore(*primitive) {
                            continue;
                        }

                        if let Some((toi, payload)) = hit_test(ray, *primitive) {
                            if toi >= 0.0 && toi <= max_time_of_impact {
                                return Some(KdRayHit {
                                    primitive: *primitive,
                                    time_of_impact: toi,
                                    payload,
                                });
                            }
                        }
                    }
                }
                KdNode::Inner { left, right, .. } => {
                    if !self.push_children(
                        &mut stack,
                        ray,
                        &inv_dir,
                        max_time_of_impact,
                        [left, right],
                    ) {
                        return None;
                    }
                }
            }
        }

        None
    }

    // Pushes the children hit by the ray, the nearest one last so it is popped first.
    // Returns `false` if the stack is full.
    fn push_children(
        &self,
        stack: &mut KdTraversalStack,
        ray: &Ray,
        inv_dir: &Vector<Real>,
        max_time_of_impact: Real,
        children: [u32; 2],
    ) -> bool {
        let [a, b] = children.map(|child| {
            self.nodes[child as usize]
                .aabb()
                .intersects_range(ray, inv_dir, max_time_of_impact)
                .map(|range| (child, range.entry))
        });

        let (near, far) = match (a, b) {
            (Some(a), Some(b)) if b.1 < a.1 => (Some(b), Some(a)),
            _ => (a, b),
        };

        for entry in [far, near].into_iter().flatten() {
            if stack.try_push(entry).is_err() {
                log::warn!(
                    "kd-tree traversal stack overflow (capacity {}): reporting no hit.",
                    KD_TRAVERSAL_STACK_SIZE
                );
                return false;
            }
        }

        true
    }
}
