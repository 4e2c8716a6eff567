/*!
kdray3d
========

**kdray3d** is a spatial acceleration structure for offline ray tracers, written with
the rust programming language.

It builds a kd-tree over caller-owned primitives using the Surface Area Heuristic
(SAH) and answers nearest-hit and any-hit ray queries on it. The tree never owns
geometry: primitives are opaque `u32` identifiers whose bounding boxes, intersection
routines, and relative costs are supplied by the caller.

*/

#![deny(non_camel_case_types)]
#![deny(unused_parens)]
#![deny(non_upper_case_globals)]
#![deny(unused_results)]
#![deny(unused_qualifications)]
#![warn(missing_docs)]
#![warn(unused_imports)]
#![allow(missing_copy_implementations)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::module_inception)]
#![allow(clippy::manual_range_contains)] // This usually makes it way more verbose that it could be.
#![allow(clippy::type_complexity)] // Complains about closures that are fairly simple.

#[cfg(feature = "serde-serialize")]
#[macro_use]
extern crate serde;
#[macro_use]
extern crate approx;
extern crate num_traits as num;

pub extern crate nalgebra as na;

pub mod bounding_volume;
pub mod partitioning;
pub mod query;

mod real {
    /// The scalar type used throughout this crate.
    pub use f32 as Real;
}

/// Compilation flags dependent aliases for mathematical types.
pub mod math {
    pub use super::real::*;
    pub use na::{Point3, Vector3};

    /// The default tolerance used for geometric operations.
    ///
    /// This is the threshold under which an extent is considered degenerate (planar)
    /// and under which two split positions are considered equal.
    pub const DEFAULT_EPSILON: Real = 1.0e-6;

    /// The dimension of the space.
    pub const DIM: usize = 3;

    /// The point type.
    pub use Point3 as Point;

    /// The vector type.
    pub use Vector3 as Vector;
}
