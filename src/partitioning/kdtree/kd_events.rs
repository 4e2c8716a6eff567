use crate::bounding_volume::Aabb;
use crate::math::{Real, DIM};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// The kind of a split-candidate event.
///
/// The discriminant order is the tie-breaking order of events sharing the same
/// position: a primitive ending at `v` is processed before a primitive lying in the
/// plane `v`, which is processed before a primitive starting at `v`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KdEventKind {
    /// The upper bound of a primitive box.
    End = 0,
    /// A primitive box with zero extent along the event's axis.
    Planar = 1,
    /// The lower bound of a primitive box.
    Start = 2,
}

/// A candidate split position contributed by a primitive along one axis.
///
/// `primitive` is the index of the primitive in the builder's primitive table, not
/// the caller-facing primitive identifier.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct KdEvent {
    /// Index of the primitive that generated this event.
    pub primitive: u32,
    /// The axis this event lies on.
    pub axis: u8,
    /// The coordinate of the event along `axis`.
    pub position: Real,
    /// Whether this event opens, closes, or is a flat primitive.
    pub kind: KdEventKind,
}

impl KdEvent {
    #[inline]
    fn sort_key(&self) -> (OrderedFloat<Real>, KdEventKind) {
        (OrderedFloat(self.position), self.kind)
    }

    /// Compares two events by `(position, kind)`.
    #[inline]
    pub fn cmp_sweep_order(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// The split-candidate events of a set of primitives clipped to a cell.
///
/// Events are stored in one list per axis, each sorted by `(position, kind)` once
/// [`KdEventSet::sort`] has been called. Every primitive of the set contributes either
/// a single `Planar` event or a `Start`/`End` pair on every axis.
#[derive(Clone, Debug, Default)]
pub struct KdEventSet {
    axes: [Vec<KdEvent>; DIM],
}

impl KdEventSet {
    /// An empty event set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty event set with room for `primitive_count` non-planar primitives.
    pub fn with_capacity(primitive_count: usize) -> Self {
        Self {
            axes: std::array::from_fn(|_| Vec::with_capacity(primitive_count * 2)),
        }
    }

    /// Appends the events of the primitive `primitive`, whose box is first clipped to `cell`.
    ///
    /// An axis along which the clipped box has an extent `<= eps` produces a single
    /// `Planar` event at the box's lower bound. The set is no longer sorted afterward.
    pub fn push_primitive(&mut self, primitive: u32, aabb: &Aabb, cell: &Aabb, eps: Real) {
        let clipped = aabb.clipped_by(cell);

        for (axis, events) in self.axes.iter_mut().enumerate() {
            let event = |position, kind| KdEvent {
                primitive,
                axis: axis as u8,
                position,
                kind,
            };

            if clipped.edge(axis) <= eps {
                events.push(event(clipped.mins[axis], KdEventKind::Planar));
            } else {
                events.push(event(clipped.mins[axis], KdEventKind::Start));
                events.push(event(clipped.maxs[axis], KdEventKind::End));
            }
        }
    }

    /// Sorts every axis by `(position, kind)`.
    pub fn sort(&mut self) {
        for events in &mut self.axes {
            events.sort_unstable_by(KdEvent::cmp_sweep_order);
        }
    }

    /// Are all the axes sorted by `(position, kind)`?
    pub fn is_sorted(&self) -> bool {
        self.axes.iter().all(|events| {
            events
                .windows(2)
                .all(|w| w[0].cmp_sweep_order(&w[1]) != Ordering::Greater)
        })
    }

    /// The events lying on the given axis.
    #[inline]
    pub fn axis(&self, axis: usize) -> &[KdEvent] {
        &self.axes[axis]
    }

    /// The total number of events, on all axes.
    pub fn len(&self) -> usize {
        self.axes.iter().map(|events| events.len()).sum()
    }

    /// Does this set contain no event at all?
    pub fn is_empty(&self) -> bool {
        self.axes.iter().all(|events| events.is_empty())
    }

    /// Iterates through the events of all the axes, axis by axis.
    pub fn iter(&self) -> impl Iterator<Item = &KdEvent> {
        self.axes.iter().flat_map(|events| events.iter())
    }

    /// Copies the events satisfying `predicate` into a new set, preserving their order.
    ///
    /// The events kept by the returned set are still sorted if `self` was.
    pub fn filtered(&self, mut predicate: impl FnMut(&KdEvent) -> bool) -> Self {
        Self {
            axes: std::array::from_fn(|axis| {
                self.axes[axis]
                    .iter()
                    .filter(|e| predicate(e))
                    .copied()
                    .collect()
            }),
        }
    }

    /// Merges two sorted event sets into a single sorted set, consuming both.
    ///
    /// Runs in linear time. When two events compare equal, the one from `a` comes first.
    pub fn merge(a: Self, b: Self) -> Self {
        let [ax, ay, az] = a.axes;
        let [bx, by, bz] = b.axes;
        Self {
            axes: [
                merge_sorted(ax, bx),
                merge_sorted(ay, by),
                merge_sorted(az, bz),
            ],
        }
    }
}

fn merge_sorted(a: Vec<KdEvent>, b: Vec<KdEvent>) -> Vec<KdEvent> {
    if b.is_empty() {
        return a;
    }
    if a.is_empty() {
        return b;
    }

    let mut result = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();

    loop {
        let next = match (a.peek(), b.peek()) {
            (Some(ea), Some(eb)) => {
                if eb.cmp_sweep_order(ea) == Ordering::Less {
                    b.next()
                } else {
                    a.next()
                }
            }
            (Some(_), None) => a.next(),
            (None, Some(_)) => b.next(),
            (None, None) => break,
        };
        result.extend(next);
    }

    result
}
