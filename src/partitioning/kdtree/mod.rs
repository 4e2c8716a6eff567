//! A kd-tree built with the Surface Area Heuristic, for nearest-hit ray queries.
//!
//! The tree is built once over a static set of primitives identified by `u32` ids and
//! stores no geometry: bounding boxes are given at construction, and ray/primitive
//! intersections are computed by caller-provided closures (or a [`KdPrimitiveSet`])
//! during traversal.
//!
//! Construction follows the `O(n log n)` event-sweep algorithm: for each axis, the
//! boundaries of the primitive boxes clipped to the current cell are sorted once, and
//! every candidate plane is evaluated incrementally in a single sweep.

pub use kd_build::{KdBuildOptions, KdCostMode};
pub use kd_events::{KdEvent, KdEventKind, KdEventSet};
pub use kd_handle::KdTreeHandle;
pub use kd_queries::KdPrimitiveSet;
pub use kd_sah::{find_best_split, sah_cost, KdSplitCandidate, KdSplitSide};
pub use kd_serialize::{KdTreeIoError, KD_TREE_FORMAT_VERSION, KD_TREE_TAG};
pub use kd_stats::KdTreeStats;
pub use kd_traverse::{KdLeaves, KdRayHit};
pub use kd_tree::{KdNode, KdTree};

/// The hard limit on the depth below which the builder never splits a node.
pub const KD_MAX_DEPTH: u32 = 64;
/// The capacity of the fixed-size stack used by ray traversals.
///
/// Traversals exceeding it give up and report no hit.
pub const KD_TRAVERSAL_STACK_SIZE: usize = 128;

mod kd_build;
mod kd_events;
mod kd_handle;
mod kd_queries;
mod kd_sah;
mod kd_serialize;
mod kd_stats;
mod kd_traverse;
mod kd_tree;
mod kd_validation;
