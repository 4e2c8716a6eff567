//! Non-persistent geometric queries.
//!
//! The kd-tree only needs ray-casting against its own node bounds: primitive
//! intersection is delegated to the caller through closures or the
//! [`KdPrimitiveSet`](crate::partitioning::KdPrimitiveSet) trait.

pub use self::ray::{Ray, SlabRange};

pub mod ray;
