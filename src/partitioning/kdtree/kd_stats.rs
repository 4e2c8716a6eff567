use super::KdNode;
use crate::math::Real;

/// Diagnostic statistics of a [`KdTree`](super::KdTree).
///
/// The `expected_*` values estimate the work done by a traversal under the assumption
/// that rays are uniformly distributed: the probability that a ray hitting the root also
/// hits a node is the ratio between the surface area of that node and the one of the
/// root.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdTreeStats {
    /// The number of levels of the tree.
    pub depth: u32,
    /// The total number of nodes.
    pub node_count: usize,
    /// The number of leaves.
    pub leaf_count: usize,
    /// The number of inner nodes.
    pub inner_count: usize,
    /// The smallest number of primitives in a single leaf.
    pub min_elements_per_leaf: usize,
    /// The largest number of primitives in a single leaf.
    pub max_elements_per_leaf: usize,
    /// The average number of primitives per leaf.
    pub avg_elements_per_leaf: Real,
    /// The expected number of inner nodes visited by a ray.
    pub expected_traversal_steps: Real,
    /// The expected number of leaves visited by a ray.
    pub expected_leaves_visited: Real,
    /// The expected number of primitive intersection tests performed by a ray.
    pub expected_objects_intersected: Real,
}

impl KdTreeStats {
    pub(crate) fn compute(nodes: &[KdNode]) -> Self {
        let mut stats = KdTreeStats::default();
        let Some(root) = nodes.first() else {
            return stats;
        };

        let root_area = root.aabb().surface_area();
        // A flat or point-like root would make every ratio infinite.
        let inv_root_area = if abs_diff_eq!(root_area, 0.0) {
            1.0
        } else {
            1.0 / root_area
        };

        stats.min_elements_per_leaf = usize::MAX;
        let mut element_sum = 0;
        let mut stack = vec![(0u32, 1u32)];

        while let Some((id, depth)) = stack.pop() {
            let node = &nodes[id as usize];
            let ratio = node.aabb().surface_area() * inv_root_area;
            stats.depth = stats.depth.max(depth);
            stats.node_count += 1;

            match *node {
                KdNode::Leaf { count, .. } => {
                    let count = count as usize;
                    stats.leaf_count += 1;
                    stats.min_elements_per_leaf = stats.min_elements_per_leaf.min(count);
                    stats.max_elements_per_leaf = stats.max_elements_per_leaf.max(count);
                    element_sum += count;
                    stats.expected_leaves_visited += ratio;
                    stats.expected_objects_intersected += count as Real * ratio;
                }
                KdNode::Inner { left, right, .. } => {
                    stats.inner_count += 1;
                    stats.expected_traversal_steps += ratio;
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }

        stats.avg_elements_per_leaf = element_sum as Real / stats.leaf_count as Real;
        stats
    }
}
