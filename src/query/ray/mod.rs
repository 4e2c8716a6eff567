//! Ray-casting related definitions and implementations.

#[doc(inline)]
pub use self::ray::Ray;
pub use self::ray_aabb::SlabRange;

#[doc(hidden)]
pub mod ray;
mod ray_aabb;
