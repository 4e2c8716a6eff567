//! Binary persistence of kd-trees.
//!
//! The layout is little-endian:
//!
//! ```text
//! tag        : u32 length, then the UTF-8 bytes of "kdray3d_kdtree"
//! version    : u32
//! root aabb  : 6 × f32 (mins, then maxs)
//! node count : u32
//! nodes      : in pre-order, each node being
//!              u32 node id, u8 leaf flag (1 for leaves, 0 for inner nodes), then
//!              leaf  → u32 count, count × u32 primitive ids
//!              inner → u8 axis, f32 split, u32 left id, u32 right id
//! ```
//!
//! Node boxes aren't stored: they are recomputed from the primitive boxes when loading.

use super::{KdNode, KdTree, KD_MAX_DEPTH};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Point, Real, DIM};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The tag starting every serialized kd-tree.
pub const KD_TREE_TAG: &str = "kdray3d_kdtree";
/// The version of the serialization format written by [`KdTree::save`].
pub const KD_TREE_FORMAT_VERSION: u32 = 1;

const LEAF_FLAG: u8 = 1;
const INNER_FLAG: u8 = 0;
const MAX_LEVELS: u32 = KD_MAX_DEPTH + 2;

/// Errors raised while saving or loading a [`KdTree`].
#[derive(thiserror::Error, Debug)]
pub enum KdTreeIoError {
    /// The underlying reader or writer failed, or the stream is truncated.
    #[error("kd-tree I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The stream doesn't start with [`KD_TREE_TAG`].
    #[error("the stream doesn't contain a kd-tree.")]
    InvalidTag,
    /// The stream was written with an unknown version of the format.
    #[error("unsupported kd-tree format version {0}.")]
    UnsupportedVersion(u32),
    /// A node flag is neither the leaf flag nor the inner node flag.
    #[error("invalid node flag {0}.")]
    InvalidNodeFlag(u8),
    /// A split axis is not 0, 1, or 2.
    #[error("invalid split axis {0}.")]
    InvalidAxis(u8),
    /// A leaf references a primitive identifier outside of the range given to
    /// [`KdTree::load`].
    #[error("invalid primitive identifier {0}.")]
    InvalidPrimitive(u32),
    /// A split position is NaN or infinite.
    #[error("the split position of node {0} isn't finite.")]
    InvalidSplit(u32),
    /// A node id doesn't match the pre-order position of the node.
    #[error("expected node id {expected}, found {found}.")]
    UnexpectedNodeId {
        /// The id implied by the position of the node in the stream.
        expected: u32,
        /// The id found in the stream.
        found: u32,
    },
    /// The tree is deeper than what traversals support.
    #[error("the kd-tree has more than {0} levels.")]
    TooDeep(u32),
    /// The number of nodes differs from the declared node count.
    #[error("expected {expected} nodes, found {found}.")]
    NodeCountMismatch {
        /// The node count declared in the header.
        expected: u32,
        /// The number of nodes actually read.
        found: u32,
    },
    /// Bytes remain after the last node.
    #[error("unexpected data after the last kd-tree node.")]
    TrailingData,
    /// The root box recomputed from the primitive boxes differs from the stored one.
    #[error("the stored root box doesn't match the primitive boxes.")]
    CorruptedBounds,
}

impl KdTree {
    /// Writes this tree to `writer`.
    ///
    /// The primitive geometry isn't written: the same bounding boxes must be provided to
    /// [`KdTree::load`].
    pub fn save<W: Write>(&self, mut writer: W) -> Result<(), KdTreeIoError> {
        writer.write_u32::<LittleEndian>(KD_TREE_TAG.len() as u32)?;
        writer.write_all(KD_TREE_TAG.as_bytes())?;
        writer.write_u32::<LittleEndian>(KD_TREE_FORMAT_VERSION)?;

        let root_aabb = self.root_aabb();
        for pt in [root_aabb.mins, root_aabb.maxs] {
            for i in 0..DIM {
                writer.write_f32::<LittleEndian>(pt[i])?;
            }
        }

        writer.write_u32::<LittleEndian>(self.nodes.len() as u32)?;

        // Nodes are already stored in pre-order.
        for (id, node) in self.nodes.iter().enumerate() {
            writer.write_u32::<LittleEndian>(id as u32)?;
            match *node {
                KdNode::Leaf { .. } => {
                    let primitives = self.leaf_primitives(node);
                    writer.write_u8(LEAF_FLAG)?;
                    writer.write_u32::<LittleEndian>(primitives.len() as u32)?;
                    for primitive in primitives {
                        writer.write_u32::<LittleEndian>(*primitive)?;
                    }
                }
                KdNode::Inner {
                    axis,
                    split,
                    left,
                    right,
                    ..
                } => {
                    writer.write_u8(INNER_FLAG)?;
                    writer.write_u8(axis)?;
                    writer.write_f32::<LittleEndian>(split)?;
                    writer.write_u32::<LittleEndian>(left)?;
                    writer.write_u32::<LittleEndian>(right)?;
                }
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Reads a tree written by [`KdTree::save`].
    ///
    /// Primitive identifiers must be smaller than `primitive_count`: `aabb` is never called
    /// with other identifiers. The `aabb` closure gives the bounding box of a primitive,
    /// exactly as for [`KdTree::build`]. It is used to recompute the node boxes, which must lead to the
    /// stored root box: loading a tree cached for a modified scene fails with
    /// [`KdTreeIoError::CorruptedBounds`].
    ///
    /// Malformed streams are reported as errors, never as panics.
    pub fn load<R: Read>(
        mut reader: R,
        primitive_count: u32,
        aabb: impl Fn(u32) -> Aabb,
    ) -> Result<Self, KdTreeIoError> {
        let tag_len = reader.read_u32::<LittleEndian>()?;
        if tag_len as usize != KD_TREE_TAG.len() {
            return Err(KdTreeIoError::InvalidTag);
        }
        let mut tag = vec![0; KD_TREE_TAG.len()];
        reader.read_exact(&mut tag)?;
        if tag != KD_TREE_TAG.as_bytes() {
            return Err(KdTreeIoError::InvalidTag);
        }

        let version = reader.read_u32::<LittleEndian>()?;
        if version != KD_TREE_FORMAT_VERSION {
            return Err(KdTreeIoError::UnsupportedVersion(version));
        }

        let mut corners = [Point::origin(); 2];
        for pt in &mut corners {
            for i in 0..DIM {
                pt[i] = reader.read_f32::<LittleEndian>()?;
            }
        }
        let stored_root_aabb = Aabb::new(corners[0], corners[1]);

        let node_count = reader.read_u32::<LittleEndian>()?;
        let mut loader = KdTreeLoader {
            reader: &mut reader,
            aabb: &aabb,
            primitive_count,
            node_count,
            // Bounded so a corrupted count can't trigger a huge allocation.
            nodes: Vec::with_capacity((node_count as usize).min(1 << 16)),
            primitives: vec![],
        };

        if node_count > 0 {
            let _ = loader.read_node(1)?;
        }

        let KdTreeLoader {
            nodes, primitives, ..
        } = loader;

        if nodes.len() != node_count as usize {
            return Err(KdTreeIoError::NodeCountMismatch {
                expected: node_count,
                found: nodes.len() as u32,
            });
        }

        if reader.read(&mut [0u8])? != 0 {
            return Err(KdTreeIoError::TrailingData);
        }

        let tree = KdTree::from_parts(nodes, primitives);
        if !tree.is_empty() && tree.root_aabb() != stored_root_aabb {
            return Err(KdTreeIoError::CorruptedBounds);
        }

        log::debug!(
            "Loaded kd-tree with {} nodes and depth {}.",
            tree.stats.node_count,
            tree.stats.depth
        );
        Ok(tree)
    }
}

struct KdTreeLoader<'a, R, F> {
    reader: &'a mut R,
    aabb: &'a F,
    primitive_count: u32,
    node_count: u32,
    nodes: Vec<KdNode>,
    primitives: Vec<u32>,
}

impl<R: Read, F: Fn(u32) -> Aabb> KdTreeLoader<'_, R, F> {
    // Reads the subtree starting at the current position and returns its box.
    // `level` is 1 for the root.
    fn read_node(&mut self, level: u32) -> Result<Aabb, KdTreeIoError> {
        // The builder splits nodes down to the depth `KD_MAX_DEPTH`, the root having depth 0.
        if level > MAX_LEVELS {
            return Err(KdTreeIoError::TooDeep(MAX_LEVELS));
        }

        let expected = self.nodes.len() as u32;
        if expected >= self.node_count {
            return Err(KdTreeIoError::NodeCountMismatch {
                expected: self.node_count,
                found: expected + 1,
            });
        }

        let found = self.reader.read_u32::<LittleEndian>()?;
        if found != expected {
            return Err(KdTreeIoError::UnexpectedNodeId { expected, found });
        }

        match self.reader.read_u8()? {
            LEAF_FLAG => {
                let count = self.reader.read_u32::<LittleEndian>()?;
                let first = self.primitives.len() as u32;
                let mut aabb = Aabb::new_invalid();

                for _ in 0..count {
                    let primitive = self.reader.read_u32::<LittleEndian>()?;
                    if primitive >= self.primitive_count {
                        return Err(KdTreeIoError::InvalidPrimitive(primitive));
                    }
                    aabb.merge(&(self.aabb)(primitive));
                    self.primitives.push(primitive);
                }

                self.nodes.push(KdNode::Leaf { aabb, first, count });
                Ok(aabb)
            }
            INNER_FLAG => {
                let axis = self.reader.read_u8()?;
                if axis as usize >= DIM {
                    return Err(KdTreeIoError::InvalidAxis(axis));
                }

                let split: Real = self.reader.read_f32::<LittleEndian>()?;
                if !split.is_finite() {
                    return Err(KdTreeIoError::InvalidSplit(expected));
                }

                let left = self.reader.read_u32::<LittleEndian>()?;
                let right = self.reader.read_u32::<LittleEndian>()?;

                if left != expected + 1 {
                    return Err(KdTreeIoError::UnexpectedNodeId {
                        expected: expected + 1,
                        found: left,
                    });
                }

                self.nodes.push(KdNode::Leaf {
                    aabb: Aabb::new_invalid(),
                    first: 0,
                    count: 0,
                });

                let left_aabb = self.read_node(level + 1)?;
                let right_expected = self.nodes.len() as u32;
                if right != right_expected {
                    return Err(KdTreeIoError::UnexpectedNodeId {
                        expected: right_expected,
                        found: right,
                    });
                }
                let right_aabb = self.read_node(level + 1)?;

                let aabb = left_aabb.merged(&right_aabb);
                self.nodes[expected as usize] = KdNode::Inner {
                    aabb,
                    axis,
                    split,
                    left,
                    right,
                };
                Ok(aabb)
            }
            flag => Err(KdTreeIoError::InvalidNodeFlag(flag)),
        }
    }
}
