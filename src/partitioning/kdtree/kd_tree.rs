use super::KdTreeStats;
use crate::bounding_volume::Aabb;
use crate::math::Real;

/// A node of a [`KdTree`].
///
/// Nodes are stored in a flat array, in pre-order: the left child of an inner node
/// always immediately follows its parent. Children are referenced by index into that
/// array.
///
/// # Node bounds
///
/// The box of a node is the union of the *unclipped* boxes of the primitives beneath it,
/// not the cell the builder assigned to the node. Every node thus contains the full box
/// of each of its primitives, and a ray is never tested against a primitive outside of
/// the boxes it went through. The cost is weaker culling around large primitives: a
/// ground plane straddling many cells makes the box of every leaf listing it as wide as
/// the ground plane itself. Scenes with such primitives should subdivide them before
/// building the tree.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum KdNode {
    /// A node containing primitives.
    Leaf {
        /// The union of the boxes of the primitives of this leaf.
        ///
        /// Invalid if the leaf is empty.
        aabb: Aabb,
        /// Index of the first primitive of this leaf in [`KdTree::primitives`].
        first: u32,
        /// Number of primitives in this leaf.
        count: u32,
    },
    /// A node split in two by an axis-aligned plane.
    Inner {
        /// The union of the boxes of all the primitives beneath this node.
        aabb: Aabb,
        /// The axis orthogonal to the split plane.
        axis: u8,
        /// The coordinate of the split plane along `axis`.
        split: Real,
        /// Index of the child below the split plane.
        left: u32,
        /// Index of the child above the split plane.
        right: u32,
    },
}

impl KdNode {
    /// The bounding box of everything beneath this node.
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        match self {
            KdNode::Leaf { aabb, .. } | KdNode::Inner { aabb, .. } => aabb,
        }
    }

    /// Is this node a leaf?
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, KdNode::Leaf { .. })
    }

    /// The indices of the two children of this node, if it is an inner node.
    #[inline]
    pub fn children(&self) -> Option<[u32; 2]> {
        match self {
            KdNode::Leaf { .. } => None,
            KdNode::Inner { left, right, .. } => Some([*left, *right]),
        }
    }
}

/// A kd-tree partitioning space with axis-aligned planes chosen with the Surface Area
/// Heuristic.
///
/// The tree references primitives by caller-defined `u32` identifiers and never stores
/// their geometry. It is immutable once built: changing the geometry requires building a
/// new tree (see [`KdTreeHandle`](super::KdTreeHandle) to publish it to concurrent
/// readers).
///
/// A primitive straddling a split plane is listed by the leaves on both sides, so
/// queries iterating over primitives may yield the same identifier more than once.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdTree {
    pub(crate) nodes: Vec<KdNode>,
    pub(crate) primitives: Vec<u32>,
    pub(crate) stats: KdTreeStats,
}

impl KdTree {
    /// An empty tree. Every query on it reports no hit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles a tree from nodes given in pre-order, and computes its statistics.
    pub(crate) fn from_parts(nodes: Vec<KdNode>, primitives: Vec<u32>) -> Self {
        let stats = KdTreeStats::compute(&nodes);
        Self {
            nodes,
            primitives,
            stats,
        }
    }

    /// Does this tree contain no node at all?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The root node, if the tree isn't empty.
    #[inline]
    pub fn root(&self) -> Option<&KdNode> {
        self.nodes.first()
    }

    /// The bounding box of all the primitives of this tree.
    ///
    /// Returns an invalid `Aabb` if the tree is empty.
    pub fn root_aabb(&self) -> Aabb {
        self.root().map(|root| *root.aabb()).unwrap_or_default()
    }

    /// The nodes of this tree, in pre-order. The root has index 0.
    #[inline]
    pub fn nodes(&self) -> &[KdNode] {
        &self.nodes
    }

    /// The primitive identifiers referenced by the leaves, concatenated in leaf order.
    #[inline]
    pub fn primitives(&self) -> &[u32] {
        &self.primitives
    }

    /// The primitive identifiers of the given node, or an empty slice for inner nodes.
    #[inline]
    pub fn leaf_primitives(&self, node: &KdNode) -> &[u32] {
        match node {
            KdNode::Leaf { first, count, .. } => {
                &self.primitives[*first as usize..(*first + *count) as usize]
            }
            KdNode::Inner { .. } => &[],
        }
    }

    /// Diagnostic statistics computed after construction.
    #[inline]
    pub fn stats(&self) -> &KdTreeStats {
        &self.stats
    }

    /// The number of levels of this tree: zero if it is empty, one if the root is a leaf.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.stats.depth
    }

    /// The number of leaves listing the primitive `primitive`.
    pub fn leaf_count_of(&self, primitive: u32) -> usize {
        self.leaves()
            .filter(|(_, _, primitives)| primitives.contains(&primitive))
            .count()
    }
}
