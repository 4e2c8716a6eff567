//! Spatial partitioning tools.

pub use self::kdtree::{
    KdBuildOptions, KdCostMode, KdLeaves, KdNode, KdPrimitiveSet, KdRayHit, KdTree,
    KdTreeHandle, KdTreeIoError, KdTreeStats,
};

pub mod kdtree;
