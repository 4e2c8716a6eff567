use super::{KdBuildOptions, KdEventKind, KdEventSet};
use crate::bounding_volume::Aabb;
use crate::math::{Real, DIM};

/// The child receiving the primitives lying exactly in a split plane.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub enum KdSplitSide {
    /// Planar primitives go to the child below the plane.
    Left,
    /// Planar primitives go to the child above the plane.
    Right,
}

/// The cheapest split found by [`find_best_split`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdSplitCandidate {
    /// The axis orthogonal to the split plane.
    pub axis: usize,
    /// The coordinate of the split plane along `axis`.
    pub position: Real,
    /// The SAH cost of this split.
    pub cost: Real,
    /// The child receiving the primitives lying in the split plane.
    pub side: KdSplitSide,
    /// The part of the cell below the split plane.
    pub left_cell: Aabb,
    /// The part of the cell above the split plane.
    pub right_cell: Aabb,
}

/// The SAH cost of a split.
///
/// `left_probability` and `right_probability` are the ratios between the surface areas
/// of the children cells and the surface area of their parent. A split leaving one of
/// its children without any primitive is made cheaper by `options.empty_side_bias`.
#[inline]
pub fn sah_cost(
    options: &KdBuildOptions,
    cost_intersection: Real,
    left_probability: Real,
    right_probability: Real,
    left_count: usize,
    right_count: usize,
) -> Real {
    let bias = if left_count == 0 || right_count == 0 {
        options.empty_side_bias
    } else {
        1.0
    };

    bias * (options.traversal_cost
        + cost_intersection
            * (left_probability * left_count as Real + right_probability * right_count as Real))
}

/// Cost of splitting `cell` at `position` along `axis`, with the planar primitives placed on
/// the cheapest side. Returns `None` if one of the two children would be flat along `axis`.
fn split_cost(
    options: &KdBuildOptions,
    cost_intersection: Real,
    cell: &Aabb,
    cell_area: Real,
    axis: usize,
    position: Real,
    left_count: usize,
    right_count: usize,
    planar_count: usize,
) -> Option<KdSplitCandidate> {
    let (left_cell, right_cell) = cell.split_at(axis, position);

    if left_cell.edge(axis) <= options.epsilon || right_cell.edge(axis) <= options.epsilon {
        return None;
    }

    let pl = left_cell.surface_area() / cell_area;
    let pr = right_cell.surface_area() / cell_area;

    let cost_left = sah_cost(
        options,
        cost_intersection,
        pl,
        pr,
        left_count + planar_count,
        right_count,
    );
    let cost_right = sah_cost(
        options,
        cost_intersection,
        pl,
        pr,
        left_count,
        right_count + planar_count,
    );

    let (cost, side) = if cost_left < cost_right {
        (cost_left, KdSplitSide::Left)
    } else {
        (cost_right, KdSplitSide::Right)
    };

    Some(KdSplitCandidate {
        axis,
        position,
        cost,
        side,
        left_cell,
        right_cell,
    })
}

/// Finds the split plane of minimal SAH cost for `primitive_count` primitives in `cell`.
///
/// Every axis of `events` is swept once, in sorted order, while maintaining the number
/// of primitives lying entirely on the left, entirely on the right, and in the plane
/// currently evaluated. Events closer than `options.epsilon` to the first event of a
/// group are considered at the same position.
///
/// Returns `None` if no split is strictly cheaper than intersecting every primitive,
/// i.e., if the node should become a leaf. Also returns `None` if the surface area of
/// `cell` doesn't exceed `min_cell_area`. The builder derives that threshold from the
/// area of the root cell, see [`KdBuildOptions::min_cell_area`].
pub fn find_best_split(
    options: &KdBuildOptions,
    cost_intersection: Real,
    events: &KdEventSet,
    primitive_count: usize,
    cell: &Aabb,
    min_cell_area: Real,
) -> Option<KdSplitCandidate> {
    debug_assert!(events.is_sorted(), "The split events must be sorted.");

    let cell_area = cell.surface_area();
    if cell_area <= min_cell_area {
        return None;
    }

    let mut best: Option<KdSplitCandidate> = None;

    for axis in 0..DIM {
        let events = events.axis(axis);
        let mut left = 0;
        let mut right = primitive_count;
        let mut j = 0;

        while j < events.len() {
            let position = events[j].position;
            let count_group = |j: &mut usize, kind| {
                let mut count = 0;
                while *j < events.len()
                    && events[*j].kind == kind
                    && (events[*j].position - position).abs() <= options.epsilon
                {
                    count += 1;
                    *j += 1;
                }
                count
            };

            let ending = count_group(&mut j, KdEventKind::End);
            let planar = count_group(&mut j, KdEventKind::Planar);
            let starting = count_group(&mut j, KdEventKind::Start);

            right = right.saturating_sub(planar + ending);

            if let Some(candidate) = split_cost(
                options,
                cost_intersection,
                cell,
                cell_area,
                axis,
                position,
                left,
                right,
                planar,
            ) {
                if best.map(|b| candidate.cost < b.cost).unwrap_or(true) {
                    best = Some(candidate);
                }
            }

            left += starting + planar;
        }
    }

    let leaf_cost = primitive_count as Real * cost_intersection;
    best.filter(|b| b.cost < leaf_cost)
}
