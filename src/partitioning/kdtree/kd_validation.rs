use super::{KdNode, KdTree, KdTreeStats};
use crate::bounding_volume::{Aabb, BoundingVolume};

impl KdTree {
    /// Panics if the tree isn't well-formed.
    ///
    /// The tree is well-formed if it is topologically correct (nodes are stored in
    /// pre-order, every node is reachable exactly once, and leaf ranges are valid) and
    /// geometrically correct (the box of every node contains the boxes of its children).
    /// The statistics must also match the ones recomputed from the nodes.
    pub fn assert_well_formed(&self) {
        if self.nodes.is_empty() {
            assert!(self.primitives.is_empty());
            assert_eq!(self.stats, KdTreeStats::default());
            return;
        }

        let mut visited = vec![false; self.nodes.len()];
        let next = self.assert_well_formed_recurse(0, &mut visited);
        assert_eq!(
            next as usize,
            self.nodes.len(),
            "Some nodes aren't reachable from the root."
        );
        assert_eq!(self.stats, KdTreeStats::compute(&self.nodes));
    }

    // Returns the id following the last node of the subtree, in pre-order.
    fn assert_well_formed_recurse(&self, node_id: u32, visited: &mut [bool]) -> u32 {
        let node = &self.nodes[node_id as usize];

        if std::mem::replace(&mut visited[node_id as usize], true) {
            panic!("Detected loop. Node {} visited twice.", node_id);
        }

        match *node {
            KdNode::Leaf { first, count, .. } => {
                assert!(
                    (first as usize + count as usize) <= self.primitives.len(),
                    "Leaf {} references primitives out of bounds.",
                    node_id
                );
                node_id + 1
            }
            KdNode::Inner {
                aabb,
                axis,
                split,
                left,
                right,
            } => {
                assert!(axis < 3, "Invalid split axis {} at node {}.", axis, node_id);
                assert!(!split.is_nan(), "NaN split position at node {}.", node_id);
                assert_eq!(left, node_id + 1, "The tree isn't stored in pre-order.");

                let right_expected = self.assert_well_formed_recurse(left, visited);
                assert_eq!(right, right_expected, "The tree isn't stored in pre-order.");
                let next = self.assert_well_formed_recurse(right, visited);

                for child in [left, right] {
                    let child_aabb = self.nodes[child as usize].aabb();
                    assert!(
                        !child_aabb.is_valid() || aabb.contains(child_aabb),
                        "Node {} doesn't contain its child {}.",
                        node_id,
                        child
                    );
                }

                next
            }
        }
    }

    /// Panics if a primitive isn't listed by any leaf, or if a leaf doesn't contain the
    /// box of one of its primitives.
    ///
    /// Together with [`KdTree::assert_well_formed`], this checks that the box of every
    /// primitive is contained in a leaf listing it, and in all the ancestors of that leaf.
    pub fn assert_primitives_contained(
        &self,
        ids: impl IntoIterator<Item = u32>,
        aabb: impl Fn(u32) -> Aabb,
    ) {
        let mut listed = std::collections::HashSet::new();

        for (node_id, leaf_aabb, primitives) in self.leaves() {
            for primitive in primitives {
                assert!(
                    leaf_aabb.contains(&aabb(*primitive)),
                    "Leaf {} doesn't contain its primitive {}.",
                    node_id,
                    primitive
                );
                let _ = listed.insert(*primitive);
            }
        }

        for id in ids {
            assert!(listed.contains(&id), "Primitive {} isn't in any leaf.", id);
        }
    }
}
