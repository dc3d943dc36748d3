//! Generic segment storage shared by linear and discrete profiles.
use crate::time::{Duration, Inclusivity, Interval};
use serde::Serialize;
use thiserror::Error;

/// Per-segment behaviour. Dynamics are anchored at their segment's start instant.
pub trait Dynamics: Clone {
    /// The same behaviour anchored `elapsed` later.
    fn rebase(&self, elapsed: Duration) -> Self;
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("A profile needs at least one segment")]
    Empty,
    #[error("Segment {segment} does not continue from the previous segment")]
    NotContiguous { segment: Interval },
    #[error("Segments do not cover the universe {universe} exactly")]
    UniverseMismatch { universe: Interval },
}

/// A gap-free sequence of `(Interval, D)` segments covering a universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile<D> {
    universe: Interval,
    segments: Vec<(Interval, D)>,
}

impl<D: Dynamics> Profile<D> {
    /// Validates that the segments are ordered, contiguous, and cover `universe` exactly.
    pub fn from_segments(universe: Interval, segments: Vec<(Interval, D)>) -> Result<Self, ProfileError> {
        let (first, last) = match (segments.first(), segments.last()) {
            (Some(first), Some(last)) => (first.0, last.0),
            _ => return Err(ProfileError::Empty),
        };
        for pair in segments.windows(2) {
            if pair[0].0.keys().1 != pair[1].0.keys().0 {
                return Err(ProfileError::NotContiguous { segment: pair[1].0 });
            }
        }
        if first.keys().0 != universe.keys().0 || last.keys().1 != universe.keys().1 {
            return Err(ProfileError::UniverseMismatch { universe });
        }
        Ok(Profile { universe, segments })
    }

    /// Builds from consecutive `(extent, dynamics)` pairs starting at `start`.
    ///
    /// Every segment is closed-open except the last, which also includes its end.
    /// Zero-length segments before the last one hold no instant and are dropped.
    pub fn from_extents(start: Duration, extents: Vec<(Duration, D)>) -> Result<Self, ProfileError> {
        let count = extents.len();
        let mut cursor = start;
        let mut segments = Vec::with_capacity(count);
        for (index, (extent, dynamics)) in extents.into_iter().enumerate() {
            let end = cursor.saturating_add(extent);
            let interval = if index + 1 == count {
                Interval::try_between(cursor, end, Inclusivity::Inclusive, Inclusivity::Inclusive)
            } else {
                Interval::try_between(cursor, end, Inclusivity::Inclusive, Inclusivity::Exclusive)
            };
            if let Some(interval) = interval {
                segments.push((interval, dynamics));
            } else if index + 1 == count {
                return Err(ProfileError::NotContiguous { segment: Interval::at(cursor) });
            }
            cursor = end;
        }
        if segments.is_empty() {
            return Err(ProfileError::Empty);
        }
        let universe = Interval::try_between(start, cursor, Inclusivity::Inclusive, Inclusivity::Inclusive)
            .ok_or(ProfileError::UniverseMismatch { universe: Interval::at(start) })?;
        Self::from_segments(universe, segments)
    }

    pub(crate) fn from_canonical(universe: Interval, segments: Vec<(Interval, D)>) -> Self {
        debug_assert!(segments.windows(2).all(|p| p[0].0.keys().1 == p[1].0.keys().0));
        Profile { universe, segments }
    }

    pub fn constant(universe: Interval, dynamics: D) -> Self {
        Profile { universe, segments: vec![(universe, dynamics)] }
    }

    pub fn universe(&self) -> Interval {
        self.universe
    }

    pub fn segments(&self) -> &[(Interval, D)] {
        &self.segments
    }

    /// The segment holding `point`, or `None` outside the universe.
    pub fn segment_at(&self, point: Duration) -> Option<&(Interval, D)> {
        let key = Interval::point_key(point);
        let idx = self.segments.partition_point(|(interval, _)| interval.keys().1 <= key);
        self.segments.get(idx).filter(|(interval, _)| interval.keys().0 <= key)
    }

    /// Restricts the profile to `bounds`, re-anchoring a clipped first segment.
    pub fn crop(&self, bounds: Interval) -> Option<Self> {
        let universe = self.universe.intersect(&bounds)?;
        let segments = self
            .segments
            .iter()
            .filter_map(|(interval, dynamics)| {
                let clipped = interval.intersect(&universe)?;
                Some((clipped, dynamics.rebase(clipped.start() - interval.start())))
            })
            .collect();
        Some(Profile { universe, segments })
    }

    pub fn map<E: Dynamics>(&self, f: impl Fn(&D) -> E) -> Profile<E> {
        Profile {
            universe: self.universe,
            segments: self.segments.iter().map(|(i, d)| (*i, f(d))).collect(),
        }
    }

    /// Re-segments both profiles onto the union of their boundaries over the shared
    /// universe and combines each aligned pair of dynamics.
    ///
    /// A single merge pass: the output has at most `n + m` pieces. Returns `None` when
    /// the universes share no instant.
    pub fn zip_with<E: Dynamics, R>(
        &self,
        other: &Profile<E>,
        mut f: impl FnMut(Interval, D, E) -> R,
    ) -> Option<(Interval, Vec<(Interval, R)>)> {
        let universe = self.universe.intersect(&other.universe)?;
        let (u_lo, u_hi) = universe.keys();
        let mut pieces = Vec::with_capacity(self.segments.len() + other.segments.len());
        let (mut i, mut j) = (0, 0);
        let mut cursor = u_lo;

        while cursor < u_hi {
            while i < self.segments.len() && self.segments[i].0.keys().1 <= cursor {
                i += 1;
            }
            while j < other.segments.len() && other.segments[j].0.keys().1 <= cursor {
                j += 1;
            }
            let (Some((left_interval, left)), Some((right_interval, right))) =
                (self.segments.get(i), other.segments.get(j))
            else {
                break;
            };
            let end = left_interval.keys().1.min(right_interval.keys().1).min(u_hi);
            if let Some(piece) = Interval::from_keys((cursor, end)) {
                let left = left.rebase(piece.start() - left_interval.start());
                let right = right.rebase(piece.start() - right_interval.start());
                pieces.push((piece, f(piece, left, right)));
            }
            cursor = end;
        }
        Some((universe, pieces))
    }
}
