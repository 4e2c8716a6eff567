use super::{find_best_split, KdEventKind, KdEventSet, KdNode, KdSplitCandidate, KdSplitSide};
use super::{KdTree, KD_MAX_DEPTH};
use crate::bounding_volume::{Aabb, BoundingVolume};
use crate::math::{Real, DEFAULT_EPSILON};
use std::time::Instant;

/// How the cost of intersecting the primitives of a node is estimated.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum KdCostMode {
    /// A single scene-wide cost, queried once with `cost(None)`.
    #[default]
    Uniform,
    /// The average of the per-primitive costs `cost(Some(id))` of the node's primitives.
    ElementWise,
}

/// Parameters of the kd-tree construction.
///
/// The defaults reproduce the classic SAH kd-tree: a unit traversal cost, a `0.8`
/// bonus for splits cutting off empty space, and a depth limit of
/// `ceil(8 + 1.5 * log2(n))` for `n` primitives.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KdBuildOptions {
    /// The cost of traversing an inner node, relative to the primitive costs.
    pub traversal_cost: Real,
    /// The factor applied to the cost of splits leaving one child empty.
    pub empty_side_bias: Real,
    /// The constant term of the depth limit.
    pub depth_base: Real,
    /// The factor of `log2(n)` in the depth limit.
    pub depth_log_factor: Real,
    /// An explicit depth limit overriding `depth_base` and `depth_log_factor`.
    ///
    /// Whatever its origin, the depth limit is clamped to [`KD_MAX_DEPTH`].
    pub max_depth: Option<u32>,
    /// How primitive intersection costs are estimated.
    pub cost_mode: KdCostMode,
    /// Extents and position differences smaller than this are considered zero.
    ///
    /// Surface areas are compared relative to the root cell instead, see
    /// [`KdBuildOptions::min_cell_area`].
    pub epsilon: Real,
}

impl Default for KdBuildOptions {
    fn default() -> Self {
        Self {
            traversal_cost: 1.0,
            empty_side_bias: 0.8,
            depth_base: 8.0,
            depth_log_factor: 1.5,
            max_depth: None,
            cost_mode: KdCostMode::Uniform,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl KdBuildOptions {
    /// Options estimating intersection costs with [`KdCostMode::ElementWise`].
    pub fn element_wise() -> Self {
        Self {
            cost_mode: KdCostMode::ElementWise,
            ..Self::default()
        }
    }

    /// The depth below which no node is split, for a tree of `primitive_count` primitives.
    pub fn max_depth_for(&self, primitive_count: usize) -> u32 {
        let depth = self.max_depth.unwrap_or_else(|| {
            let n = primitive_count.max(1) as Real;
            (self.depth_base + self.depth_log_factor * n.log2())
                .ceil()
                .max(0.0) as u32
        });
        depth.min(KD_MAX_DEPTH)
    }

    /// The surface area at or under which a cell is never split, for a tree whose root
    /// cell is `root_cell`.
    ///
    /// This is `epsilon` times the root area, so scenes modelled in small units aren't
    /// collapsed into a single leaf.
    #[inline]
    pub fn min_cell_area(&self, root_cell: &Aabb) -> Real {
        root_cell.surface_area() * self.epsilon
    }

    fn assert_valid(&self) {
        assert!(
            self.traversal_cost >= 0.0 && self.traversal_cost.is_finite(),
            "The traversal cost must be finite and non-negative."
        );
        assert!(
            self.empty_side_bias > 0.0 && self.empty_side_bias.is_finite(),
            "The empty side bias must be finite and positive."
        );
        assert!(
            self.epsilon >= 0.0 && self.epsilon.is_finite(),
            "The epsilon must be finite and non-negative."
        );
    }
}

#[derive(Copy, Clone, Debug)]
struct KdPrimitiveRef {
    id: u32,
    aabb: Aabb,
    cost: Real,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum KdSide {
    Left,
    Right,
    Both,
}

struct KdTreeBuilder<'a> {
    options: &'a KdBuildOptions,
    prims: Vec<KdPrimitiveRef>,
    sides: Vec<KdSide>,
    global_cost: Real,
    max_depth: u32,
    min_cell_area: Real,
    nodes: Vec<KdNode>,
    primitives: Vec<u32>,
}

impl KdTree {
    /// Builds a kd-tree over the given primitive identifiers.
    ///
    /// # Arguments
    ///
    /// * `ids` - the identifiers of the primitives to insert.
    /// * `aabb` - the bounding box of a primitive. Called exactly once per primitive.
    /// * `cost` - the relative cost of intersecting a primitive. `cost(None)` gives the
    ///   scene-wide cost used by [`KdCostMode::Uniform`]; `cost(Some(id))` is only called
    ///   in [`KdCostMode::ElementWise`].
    /// * `options` - the construction parameters.
    ///
    /// Construction never fails: degenerate inputs (coincident or flat primitives)
    /// produce leaves instead of splits. Zero primitives give an empty tree, and a
    /// single primitive gives a tree made of a single leaf.
    ///
    /// # Panics
    ///
    /// Panics if a bounding box isn't finite or has `mins > maxs` on some axis, if a cost
    /// is negative or not finite, or if the options are not valid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use kdray3d::bounding_volume::Aabb;
    /// use kdray3d::na::{Point3, Vector3};
    /// use kdray3d::partitioning::{KdBuildOptions, KdTree};
    /// use kdray3d::query::Ray;
    ///
    /// // Ten unit cubes spaced along the `x` axis.
    /// let boxes: Vec<Aabb> = (0..10)
    ///     .map(|i| {
    ///         let x = i as f32 * 2.0;
    ///         Aabb::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 1.0, 1.0))
    ///     })
    ///     .collect();
    /// let options = KdBuildOptions::default();
    /// let tree = KdTree::build(0..10, |i| boxes[i as usize], |_| 4.0, &options);
    ///
    /// let ray = Ray::new(Point3::new(8.5, 0.5, -1.0), Vector3::z());
    /// let hit = tree.cast_ray(&ray, f32::MAX, |ray, i| {
    ///     let range = boxes[i as usize].intersects_range(ray, &ray.inv_dir(), f32::MAX)?;
    ///     Some((range.entry, ()))
    /// });
    /// assert_eq!(hit.map(|hit| hit.primitive), Some(4));
    /// ```
    pub fn build(
        ids: impl IntoIterator<Item = u32>,
        aabb: impl Fn(u32) -> Aabb,
        cost: impl Fn(Option<u32>) -> Real,
        options: &KdBuildOptions,
    ) -> Self {
        options.assert_valid();
        let timer = Instant::now();

        let element_wise = options.cost_mode == KdCostMode::ElementWise;
        let prims: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let aabb = aabb(id);
                assert!(
                    aabb.is_valid() && aabb.is_finite(),
                    "Invalid bounding box for primitive {}: {:?}",
                    id,
                    aabb
                );
                let cost = if element_wise {
                    checked_cost(cost(Some(id)))
                } else {
                    0.0
                };
                KdPrimitiveRef { id, aabb, cost }
            })
            .collect();
        assert!(
            prims.len() <= u32::MAX as usize,
            "Too many primitives for a kd-tree."
        );

        if prims.is_empty() {
            log::warn!("Building a kd-tree without any primitive.");
            return KdTree::new();
        }

        let global_cost = if element_wise {
            0.0
        } else {
            checked_cost(cost(None))
        };

        let mut builder = KdTreeBuilder {
            options,
            sides: vec![KdSide::Both; prims.len()],
            max_depth: options.max_depth_for(prims.len()),
            min_cell_area: 0.0,
            prims,
            global_cost,
            nodes: vec![],
            primitives: vec![],
        };

        if builder.prims.len() == 1 {
            let _ = builder.make_leaf(vec![0]);
        } else {
            let mut cell = Aabb::new_invalid();
            for prim in &builder.prims {
                cell.merge(&prim.aabb);
            }
            if cell.is_planar(options.epsilon) {
                cell.inflate(options.epsilon);
            }
            builder.min_cell_area = options.min_cell_area(&cell);

            let mut events = KdEventSet::with_capacity(builder.prims.len());
            for (i, prim) in builder.prims.iter().enumerate() {
                events.push_primitive(i as u32, &prim.aabb, &cell, options.epsilon);
            }
            events.sort();

            let objects = (0..builder.prims.len() as u32).collect();
            let _ = builder.build_node(events, objects, cell, 0);
        }

        let tree = KdTree::from_parts(builder.nodes, builder.primitives);
        let stats = tree.stats();
        log::info!(
            "Built kd-tree over {} primitives in {:.2?}: {} nodes, {} leaves, depth {} (limit {}), {:.2} primitives per leaf.",
            builder.prims.len(),
            timer.elapsed(),
            stats.node_count,
            stats.leaf_count,
            stats.depth,
            builder.max_depth,
            stats.avg_elements_per_leaf,
        );
        log::debug!("kd-tree statistics: {:?}", stats);

        tree
    }
}

fn checked_cost(cost: Real) -> Real {
    assert!(
        cost >= 0.0 && cost.is_finite(),
        "Primitive costs must be finite and non-negative, got {}.",
        cost
    );
    cost
}

impl KdTreeBuilder<'_> {
    fn cost_intersection(&self, objects: &[u32]) -> Real {
        match self.options.cost_mode {
            KdCostMode::Uniform => self.global_cost,
            KdCostMode::ElementWise => {
                let sum: Real = objects
                    .iter()
                    .map(|o| self.prims[*o as usize].cost)
                    .sum();
                sum / objects.len() as Real
            }
        }
    }

    // Builds the subtree of the given objects and returns its bounding box.
    // The node is pushed before its children so the ids follow the pre-order.
    fn build_node(
        &mut self,
        events: KdEventSet,
        objects: Vec<u32>,
        cell: Aabb,
        depth: u32,
    ) -> Aabb {
        if objects.is_empty()
            || cell.surface_area() <= self.min_cell_area
            || depth > self.max_depth
        {
            return self.make_leaf(objects);
        }

        let cost_intersection = self.cost_intersection(&objects);
        let Some(split) = find_best_split(
            self.options,
            cost_intersection,
            &events,
            objects.len(),
            &cell,
            self.min_cell_area,
        ) else {
            return self.make_leaf(objects);
        };

        self.classify(&events, &objects, &split);

        let mut left = Vec::with_capacity(objects.len());
        let mut right = Vec::with_capacity(objects.len());
        for o in &objects {
            match self.sides[*o as usize] {
                KdSide::Left => left.push(*o),
                KdSide::Right => right.push(*o),
                KdSide::Both => {
                    left.push(*o);
                    right.push(*o);
                }
            }
        }

        let sides = &self.sides;
        let left_only = events.filtered(|e| sides[e.primitive as usize] == KdSide::Left);
        let right_only = events.filtered(|e| sides[e.primitive as usize] == KdSide::Right);
        drop(events);

        // Straddling primitives are clipped again, to each child cell.
        let mut left_both = KdEventSet::new();
        let mut right_both = KdEventSet::new();
        for o in objects {
            if self.sides[o as usize] == KdSide::Both {
                let aabb = &self.prims[o as usize].aabb;
                left_both.push_primitive(o, aabb, &split.left_cell, self.options.epsilon);
                right_both.push_primitive(o, aabb, &split.right_cell, self.options.epsilon);
            }
        }
        left_both.sort();
        right_both.sort();

        let left_events = KdEventSet::merge(left_only, left_both);
        let right_events = KdEventSet::merge(right_only, right_both);

        let id = self.nodes.len();
        self.nodes.push(KdNode::Leaf {
            aabb: Aabb::new_invalid(),
            first: 0,
            count: 0,
        });

        let left_id = self.nodes.len() as u32;
        let left_aabb = self.build_node(left_events, left, split.left_cell, depth + 1);
        let right_id = self.nodes.len() as u32;
        let right_aabb = self.build_node(right_events, right, split.right_cell, depth + 1);

        let aabb = left_aabb.merged(&right_aabb);
        self.nodes[id] = KdNode::Inner {
            aabb,
            axis: split.axis as u8,
            split: split.position,
            left: left_id,
            right: right_id,
        };
        aabb
    }

    fn make_leaf(&mut self, objects: Vec<u32>) -> Aabb {
        let prims = &self.prims;
        let mut aabb = Aabb::new_invalid();
        let first = self.primitives.len() as u32;

        for o in &objects {
            let prim = &prims[*o as usize];
            aabb.merge(&prim.aabb);
            self.primitives.push(prim.id);
        }

        self.nodes.push(KdNode::Leaf {
            aabb,
            first,
            count: objects.len() as u32,
        });
        aabb
    }

    // Assigns a side to each object, from its events along the split axis.
    fn classify(&mut self, events: &KdEventSet, objects: &[u32], split: &KdSplitCandidate) {
        for o in objects {
            self.sides[*o as usize] = KdSide::Both;
        }

        let v = split.position;
        for e in events.axis(split.axis) {
            let side = &mut self.sides[e.primitive as usize];
            match e.kind {
                KdEventKind::End if e.position <= v => *side = KdSide::Left,
                KdEventKind::Start if e.position >= v => *side = KdSide::Right,
                KdEventKind::Planar => {
                    let in_plane = (e.position - v).abs() <= self.options.epsilon;
                    *side = if e.position < v || (in_plane && split.side == KdSplitSide::Left) {
                        KdSide::Left
                    } else {
                        KdSide::Right
                    };
                }
                _ => {}
            }
        }
    }
}
