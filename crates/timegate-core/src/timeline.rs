//! Interval merge engine and timeline builder.
//!
//! A [`Timeline`] is the canonical, merged, squashed sequence of
//! [`Segment`]s governing one node's effective activity over all time.
//! Time-range declarations cascade strictly: outer declarations establish a
//! baseline and inner ones may only narrow or disable the active window,
//! never widen it. [`merge`] folds one overriding sequence into the
//! accumulated one, [`squash`] collapses adjacent duplicates, and
//! [`build_timeline`] chains both over a node's full override chain.

use serde::{Deserialize, Serialize};

use crate::error::{try_grow, BuildError};
use crate::segment::{Segment, SegmentKind};

/// Ordered segment sequence, strictly ascending by start time.
///
/// An empty timeline is equivalent to a single implicit `Cont` segment
/// covering all time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    segments: Vec<Segment>,
}

impl Timeline {
    /// Timeline with no segments: continuously active.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a timeline from declared segments, rejecting malformed input
    /// before playback starts: every start time must be finite and the
    /// sequence strictly ascending, and a `Once` render time must be
    /// finite.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, BuildError> {
        for (i, seg) in segments.iter().enumerate() {
            if !seg.start_time.is_finite() {
                return Err(BuildError::InvalidConfiguration(format!(
                    "segment #{i} has non-finite start time {}",
                    seg.start_time
                )));
            }
            if seg.kind == SegmentKind::Once && !seg.render_time.is_finite() {
                return Err(BuildError::InvalidConfiguration(format!(
                    "once segment #{i} has non-finite render time {}",
                    seg.render_time
                )));
            }
            if i > 0 && segments[i - 1].start_time >= seg.start_time {
                return Err(BuildError::InvalidConfiguration(format!(
                    "segment start times must be strictly ascending ({} then {})",
                    segments[i - 1].start_time,
                    seg.start_time
                )));
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment covering `t`, if `t` falls at or after the first start time.
    pub fn segment_at(&self, t: f64) -> Option<&Segment> {
        let idx = self.segments.partition_point(|seg| seg.start_time <= t);
        idx.checked_sub(1).map(|i| &self.segments[i])
    }

    /// Effective activity state at `t`. Before the first declared segment
    /// (and on an empty timeline) playback is continuous.
    pub fn kind_at(&self, t: f64) -> SegmentKind {
        self.segment_at(t).map_or(SegmentKind::Cont, |seg| seg.kind)
    }

    /// Whether the governed subtree is logically active at `t`.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.kind_at(t) != SegmentKind::Noop
    }

    /// Start time of the next non-`Noop` segment strictly after the
    /// segment covering `t`. Used to probe for an upcoming activation
    /// while the subtree is currently inactive.
    pub fn next_active_start(&self, t: f64) -> Option<f64> {
        let from = self.segments.partition_point(|seg| seg.start_time <= t);
        self.segments[from..]
            .iter()
            .find(|seg| seg.kind != SegmentKind::Noop)
            .map(|seg| seg.start_time)
    }

    /// Collapse runs of consecutive segments with the same effect down to
    /// their first occurrence. Only the previous *kept* segment is
    /// compared, so an interior run collapses to where it started.
    pub fn squash(self) -> Result<Self, BuildError> {
        let mut out: Vec<Segment> = Vec::new();
        try_grow(&mut out, self.segments.len(), "squashed timeline")?;

        let mut last_kept: Option<Segment> = None;
        for seg in self.segments {
            if let Some(prev) = last_kept {
                if prev.same_effect(&seg) {
                    continue;
                }
            }
            out.push(seg);
            last_kept = Some(seg);
        }
        Ok(Self { segments: out })
    }
}

/// Merge an overriding segment sequence `sub` (declared in a more deeply
/// nested scope) into the accumulated sequence `cur`.
///
/// Two-pointer merge by start time; `sub` wins ties. The just-emitted
/// segment is then downgraded against the other track's currently active
/// segment: an active `Noop` forces `Noop`, an active `Once` forces
/// non-`Noop` segments to `Once` (carrying the active segment's render
/// time), and `Cont` never overrides anything. A segment is never
/// re-enabled once downgraded.
pub fn merge(cur: &Timeline, sub: &Timeline) -> Result<Timeline, BuildError> {
    let cur_segs = cur.segments();
    let sub_segs = sub.segments();

    let mut out: Vec<Segment> = Vec::new();
    try_grow(&mut out, cur_segs.len() + sub_segs.len(), "merged timeline")?;

    let (mut cur_i, mut sub_i) = (0usize, 0usize);
    let mut last_cur: Option<Segment> = None;
    let mut last_sub: Option<Segment> = None;

    while cur_i < cur_segs.len() || sub_i < sub_segs.len() {
        let next_cur = cur_segs.get(cur_i).map_or(f64::INFINITY, |s| s.start_time);
        let next_sub = sub_segs.get(sub_i).map_or(f64::INFINITY, |s| s.start_time);

        let (emitted, active_other) = if next_cur < next_sub {
            let seg = cur_segs[cur_i];
            cur_i += 1;
            last_cur = Some(seg);
            (seg, last_sub)
        } else {
            let seg = sub_segs[sub_i];
            sub_i += 1;
            last_sub = Some(seg);
            (seg, last_cur)
        };

        out.push(apply_override(emitted, active_other));
    }

    Ok(Timeline { segments: out })
}

/// Downgrade `seg` against the other track's active segment, if any.
fn apply_override(mut seg: Segment, other: Option<Segment>) -> Segment {
    if let Some(other) = other {
        match other.kind {
            SegmentKind::Noop => seg.kind = SegmentKind::Noop,
            SegmentKind::Once if seg.kind != SegmentKind::Noop => {
                seg.kind = SegmentKind::Once;
                // One consistent rule for both directions: the active
                // `Once` segment doing the overriding keeps its render
                // time.
                seg.render_time = other.render_time;
            }
            _ => {}
        }
    }
    seg
}

/// Fold a node's override chain (outermost declaration first, innermost
/// last) into one canonical timeline. An empty chain yields the empty,
/// implicitly continuous timeline.
pub fn build_timeline<I>(override_chain: I) -> Result<Timeline, BuildError>
where
    I: IntoIterator<Item = Timeline>,
{
    let mut acc = Timeline::empty();
    for sub in override_chain {
        acc = merge(&acc, &sub)?;
    }
    acc.squash()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(t: f64) -> Segment {
        Segment::noop(t)
    }
    fn cont(t: f64) -> Segment {
        Segment::cont(t)
    }
    fn once(t: f64, rt: f64) -> Segment {
        Segment::once(t, rt)
    }

    fn timeline(segs: &[Segment]) -> Timeline {
        Timeline::from_segments(segs.to_vec()).unwrap()
    }

    #[test]
    fn from_segments_rejects_unordered() {
        assert!(Timeline::from_segments(vec![noop(0.5), cont(0.2)]).is_err());
        assert!(Timeline::from_segments(vec![noop(0.5), cont(0.5)]).is_err());
        assert!(Timeline::from_segments(vec![noop(f64::NAN)]).is_err());
        assert!(Timeline::from_segments(vec![once(0.0, f64::INFINITY)]).is_err());
    }

    #[test]
    fn two_track_fold() {
        // Two cascading range declarations; the inner one may only narrow
        // the active window established by the outer one.
        let a = timeline(&[noop(0.2), cont(0.3), noop(0.5)]);
        let b = timeline(&[noop(0.1), cont(0.4), noop(0.7)]);

        let merged = merge(&a, &b).unwrap();
        assert_eq!(
            merged.segments(),
            &[noop(0.1), noop(0.2), noop(0.3), cont(0.4), noop(0.5), noop(0.7)]
        );

        let folded = build_timeline([a, b]).unwrap();
        assert_eq!(folded.segments(), &[noop(0.1), cont(0.4), noop(0.5)]);
    }

    #[test]
    fn negative_starts_and_multiple_windows() {
        let a = timeline(&[noop(-0.3), cont(0.1), noop(0.2), cont(0.3), noop(0.4)]);
        let b = timeline(&[noop(0.15), cont(0.35)]);

        let folded = build_timeline([a, b]).unwrap();
        assert_eq!(
            folded.segments(),
            &[noop(-0.3), cont(0.1), noop(0.15), cont(0.35), noop(0.4)]
        );
    }

    #[test]
    fn sub_wins_ties() {
        let a = timeline(&[cont(0.0), noop(1.0)]);
        let b = timeline(&[cont(1.0)]);
        // The tie at t=1.0 emits the sub segment first; the cur noop then
        // lands after it and is forced down by nothing (sub is Cont), so
        // the noop still applies from 1.0 on.
        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.segments(), &[cont(0.0), cont(1.0), noop(1.0)]);
    }

    #[test]
    fn noop_dominates_over_its_window() {
        // While a sub noop is active, every merged point is noop.
        let a = timeline(&[cont(0.0), once(1.0, 0.5), cont(2.0)]);
        let b = timeline(&[noop(0.5), cont(3.0)]);
        let merged = merge(&a, &b).unwrap();
        for seg in merged.segments() {
            if seg.start_time >= 0.5 && seg.start_time < 3.0 {
                assert_eq!(seg.kind, SegmentKind::Noop, "at {}", seg.start_time);
            }
        }
    }

    #[test]
    fn cont_never_overrides() {
        // A Cont segment in either track leaves the other track's
        // segments untouched.
        let a = timeline(&[once(0.0, 2.0), noop(1.0)]);
        let b = timeline(&[cont(0.5)]);
        let merged = merge(&a, &b).unwrap();
        // b's cont is downgraded by a's active once; a's own segments are
        // unaffected by b.
        assert_eq!(merged.segments(), &[once(0.0, 2.0), once(0.5, 2.0), noop(1.0)]);
    }

    #[test]
    fn once_override_carries_sub_render_time() {
        // sub's active Once overrides a later cur segment.
        let a = timeline(&[cont(0.0), cont(1.5)]);
        let b = timeline(&[once(1.0, 5.0)]);
        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.segments(), &[cont(0.0), once(1.0, 5.0), once(1.5, 5.0)]);
    }

    #[test]
    fn once_override_carries_cur_render_time() {
        // The opposite direction uses the same rule: the already-active
        // Once segment keeps its render time.
        let a = timeline(&[once(0.0, 2.0)]);
        let b = timeline(&[cont(1.0)]);
        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.segments(), &[once(0.0, 2.0), once(1.0, 2.0)]);
    }

    #[test]
    fn once_does_not_resurrect_noop() {
        let a = timeline(&[once(0.0, 2.0)]);
        let b = timeline(&[noop(1.0)]);
        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.segments(), &[once(0.0, 2.0), noop(1.0)]);
    }

    #[test]
    fn merge_covers_every_input_start() {
        // Output is strictly ascending and contains every start time
        // from either input.
        let a = timeline(&[noop(0.2), cont(0.3), noop(0.5)]);
        let b = timeline(&[noop(0.1), cont(0.4), noop(0.7)]);
        let merged = merge(&a, &b).unwrap();

        let starts: Vec<f64> = merged.segments().iter().map(|s| s.start_time).collect();
        for w in starts.windows(2) {
            assert!(w[0] <= w[1]);
        }
        for seg in a.segments().iter().chain(b.segments()) {
            assert!(starts.contains(&seg.start_time));
        }
    }

    #[test]
    fn squash_keeps_first_of_a_run() {
        let tl = Timeline {
            segments: vec![noop(0.0), noop(0.5), noop(1.0), cont(2.0), cont(3.0), noop(4.0)],
        };
        let squashed = tl.squash().unwrap();
        assert_eq!(squashed.segments(), &[noop(0.0), cont(2.0), noop(4.0)]);
    }

    #[test]
    fn squash_compares_once_render_times() {
        let tl = Timeline {
            segments: vec![once(0.0, 1.0), once(0.5, 1.0), once(1.0, 2.0)],
        };
        let squashed = tl.squash().unwrap();
        assert_eq!(squashed.segments(), &[once(0.0, 1.0), once(1.0, 2.0)]);
    }

    #[test]
    fn squash_is_idempotent() {
        let tl = Timeline {
            segments: vec![noop(0.1), noop(0.2), cont(0.4), noop(0.5), noop(0.7)],
        };
        // Squashing twice changes nothing.
        let once_squashed = tl.squash().unwrap();
        let twice_squashed = once_squashed.clone().squash().unwrap();
        assert_eq!(once_squashed, twice_squashed);

        // Effective coverage is unchanged by squashing.
        let tl = Timeline {
            segments: vec![noop(0.1), noop(0.2), cont(0.4), noop(0.5), noop(0.7)],
        };
        let squashed = tl.clone().squash().unwrap();
        for t in [-1.0, 0.0, 0.15, 0.3, 0.45, 0.6, 1.0] {
            assert_eq!(tl.kind_at(t), squashed.kind_at(t), "at {t}");
        }
    }

    #[test]
    fn empty_chain_is_implicit_cont() {
        let tl = build_timeline(std::iter::empty()).unwrap();
        assert!(tl.is_empty());
        assert!(tl.is_active_at(-10.0));
        assert!(tl.is_active_at(0.0));
        assert!(tl.is_active_at(1e9));
    }

    #[test]
    fn lookup_queries() {
        let tl = timeline(&[noop(0.0), cont(2.0), noop(5.0), once(8.0, 3.0)]);

        assert_eq!(tl.kind_at(-0.5), SegmentKind::Cont);
        assert_eq!(tl.kind_at(0.0), SegmentKind::Noop);
        assert_eq!(tl.kind_at(1.99), SegmentKind::Noop);
        assert_eq!(tl.kind_at(2.0), SegmentKind::Cont);
        assert_eq!(tl.kind_at(6.0), SegmentKind::Noop);
        assert_eq!(tl.kind_at(100.0), SegmentKind::Once);

        assert_eq!(tl.next_active_start(0.0), Some(2.0));
        assert_eq!(tl.next_active_start(2.5), Some(8.0));
        assert_eq!(tl.next_active_start(5.0), Some(8.0));
        assert_eq!(tl.next_active_start(8.0), None);
    }
}
