//! Tagged time-interval primitive.
//!
//! A [`Segment`] marks the desired activity state of a subtree from its
//! `start_time` onward, until the next segment takes over. Segments
//! partition time into half-open intervals; the last one extends to +∞.

use serde::{Deserialize, Serialize};

/// Activity state declared by a segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Render the subtree a single time, at the segment's render time.
    Once,
    /// The subtree is inactive.
    Noop,
    /// The subtree plays back continuously.
    Cont,
}

/// One typed, time-stamped interval marker.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start_time: f64,
    /// Frozen render time; meaningful only for [`SegmentKind::Once`].
    pub render_time: f64,
}

impl Segment {
    pub fn noop(start_time: f64) -> Self {
        Self {
            kind: SegmentKind::Noop,
            start_time,
            render_time: 0.0,
        }
    }

    pub fn cont(start_time: f64) -> Self {
        Self {
            kind: SegmentKind::Cont,
            start_time,
            render_time: 0.0,
        }
    }

    pub fn once(start_time: f64, render_time: f64) -> Self {
        Self {
            kind: SegmentKind::Once,
            start_time,
            render_time,
        }
    }

    /// Two segments are duplicates when they declare the same state; only
    /// `Once` segments additionally compare their render time.
    pub(crate) fn same_effect(&self, other: &Segment) -> bool {
        self.kind == other.kind
            && (self.kind != SegmentKind::Once || self.render_time == other.render_time)
    }
}
