//! A contiguous span of simulated time with independently inclusive or exclusive ends.
//!
//! Every instant `t` is identified with the edge key `2t` and the open gap `(t, t + 1)`
//! with the key `2t + 1`. An interval is then the half-open key range `[lo, hi)`, and
//! every non-empty interval corresponds to exactly one non-empty key range. The sweep
//! algorithms in [`super::windows`] and [`crate::profile`] work purely on these keys.
use super::duration::Duration;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Inclusivity {
    Inclusive,
    Exclusive,
}

impl Inclusivity {
    pub fn is_inclusive(self) -> bool {
        matches!(self, Inclusivity::Inclusive)
    }

    pub fn opposite(self) -> Self {
        match self {
            Inclusivity::Inclusive => Inclusivity::Exclusive,
            Inclusivity::Exclusive => Inclusivity::Inclusive,
        }
    }
}

/// Half-open range of edge keys. `lo < hi` always holds for a key range built from an interval.
pub(crate) type KeyRange = (i128, i128);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawInterval", rename_all = "camelCase")]
pub struct Interval {
    start: Duration,
    end: Duration,
    start_inclusivity: Inclusivity,
    end_inclusivity: Inclusivity,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInterval {
    start: Duration,
    end: Duration,
    start_inclusivity: Inclusivity,
    end_inclusivity: Inclusivity,
}

impl TryFrom<RawInterval> for Interval {
    type Error = String;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        Interval::try_between(raw.start, raw.end, raw.start_inclusivity, raw.end_inclusivity)
            .ok_or_else(|| format!("empty interval from {} to {}", raw.start, raw.end))
    }
}

impl Interval {
    pub const FOREVER: Interval = Interval {
        start: Duration::MIN,
        end: Duration::MAX,
        start_inclusivity: Inclusivity::Inclusive,
        end_inclusivity: Inclusivity::Inclusive,
    };

    /// Builds an interval, or `None` if the bounds describe no instant at all.
    pub fn try_between(
        start: Duration,
        end: Duration,
        start_inclusivity: Inclusivity,
        end_inclusivity: Inclusivity,
    ) -> Option<Self> {
        let candidate = Interval { start, end, start_inclusivity, end_inclusivity };
        let (lo, hi) = candidate.keys();
        (lo < hi).then_some(candidate)
    }

    /// # Panics
    /// If `start > end`, or the interval is zero-width without both ends included.
    pub fn between(
        start: Duration,
        end: Duration,
        start_inclusivity: Inclusivity,
        end_inclusivity: Inclusivity,
    ) -> Self {
        match Self::try_between(start, end, start_inclusivity, end_inclusivity) {
            Some(interval) => interval,
            None => panic!("Malformed interval: {} to {} describes no instant", start, end),
        }
    }

    pub fn closed(start: Duration, end: Duration) -> Self {
        Self::between(start, end, Inclusivity::Inclusive, Inclusivity::Inclusive)
    }

    pub fn between_closed_open(start: Duration, end: Duration) -> Self {
        Self::between(start, end, Inclusivity::Inclusive, Inclusivity::Exclusive)
    }

    pub fn at(point: Duration) -> Self {
        Self::closed(point, point)
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    pub fn start_inclusivity(&self) -> Inclusivity {
        self.start_inclusivity
    }

    pub fn end_inclusivity(&self) -> Inclusivity {
        self.end_inclusivity
    }

    pub fn includes_start(&self) -> bool {
        self.start_inclusivity.is_inclusive()
    }

    pub fn includes_end(&self) -> bool {
        self.end_inclusivity.is_inclusive()
    }

    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    // --- Edge Keys ---

    pub(crate) fn keys(&self) -> KeyRange {
        let start = self.start.micros() as i128 * 2;
        let end = self.end.micros() as i128 * 2;
        let lo = if self.includes_start() { start } else { start + 1 };
        let hi = if self.includes_end() { end + 1 } else { end };
        (lo, hi)
    }

    /// Inverse of [`Interval::keys`]. Returns `None` for an empty range.
    pub(crate) fn from_keys((lo, hi): KeyRange) -> Option<Self> {
        if lo >= hi {
            return None;
        }
        let (start, start_inclusivity) = if lo.rem_euclid(2) == 0 {
            (lo.div_euclid(2), Inclusivity::Inclusive)
        } else {
            (lo.div_euclid(2), Inclusivity::Exclusive)
        };
        let (end, end_inclusivity) = if hi.rem_euclid(2) == 1 {
            (hi.div_euclid(2), Inclusivity::Inclusive)
        } else {
            (hi.div_euclid(2), Inclusivity::Exclusive)
        };
        Some(Interval {
            start: Duration::from_micros(start as i64),
            end: Duration::from_micros(end as i64),
            start_inclusivity,
            end_inclusivity,
        })
    }

    /// Key of the instant `t` itself.
    pub(crate) fn point_key(t: Duration) -> i128 {
        t.micros() as i128 * 2
    }

    // --- Orderings ---

    /// Orders by start; at equal times an included start comes first.
    pub fn compare_starts(&self, other: &Interval) -> Ordering {
        self.keys().0.cmp(&other.keys().0)
    }

    /// Orders by end; at equal times an excluded end comes first.
    pub fn compare_ends(&self, other: &Interval) -> Ordering {
        self.keys().1.cmp(&other.keys().1)
    }

    /// Compares this interval's end against `other`'s start.
    ///
    /// `Less` means a gap separates them, `Equal` means they meet with no gap and no
    /// shared instant, and `Greater` means they overlap.
    pub fn compare_end_to_start(&self, other: &Interval) -> Ordering {
        self.keys().1.cmp(&other.keys().0)
    }

    // --- Queries ---

    pub fn contains_point(&self, t: Duration) -> bool {
        let (lo, hi) = self.keys();
        let key = Self::point_key(t);
        lo <= key && key < hi
    }

    /// True if every instant of `other` lies inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        let (lo, hi) = self.keys();
        let (other_lo, other_hi) = other.keys();
        lo <= other_lo && other_hi <= hi
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let (lo, hi) = self.keys();
        let (other_lo, other_hi) = other.keys();
        Self::from_keys((lo.max(other_lo), hi.min(other_hi)))
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.intersect(other).is_some()
    }

    /// Moves the start by `start_shift` and the end by `end_shift`, keeping inclusivity.
    pub fn shift_by(&self, start_shift: Duration, end_shift: Duration) -> Option<Interval> {
        Self::try_between(
            self.start.saturating_add(start_shift),
            self.end.saturating_add(end_shift),
            self.start_inclusivity,
            self.end_inclusivity,
        )
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.includes_start() { '[' } else { '(' };
        let close = if self.includes_end() { ']' } else { ')' };
        write!(f, "{}{}, {}{}", open, self.start, self.end, close)
    }
}
