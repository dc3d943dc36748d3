//! Boolean partitions of a time universe.
//!
//! A `Windows` value always covers its universe with no gaps. Segments are kept in
//! canonical form: ordered, contiguous, and never two neighbours with the same value,
//! so structural equality is semantic equality.
use super::duration::Duration;
use super::interval::{Interval, KeyRange};
use crate::profile::{LinearDynamics, LinearProfile};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Windows {
    universe: Interval,
    segments: Vec<(Interval, bool)>,
}

/// Accumulates keyed pieces left to right, merging neighbours with equal values.
#[derive(Default)]
pub(crate) struct KeyedBuilder {
    pieces: Vec<(i128, i128, bool)>,
}

impl KeyedBuilder {
    pub(crate) fn push(&mut self, lo: i128, hi: i128, value: bool) {
        if lo >= hi {
            return;
        }
        if let Some(last) = self.pieces.last_mut() {
            if last.1 == lo && last.2 == value {
                last.1 = hi;
                return;
            }
        }
        self.pieces.push((lo, hi, value));
    }

    pub(crate) fn finish(self, universe: Interval) -> Windows {
        let segments = self
            .pieces
            .into_iter()
            .filter_map(|(lo, hi, value)| Interval::from_keys((lo, hi)).map(|i| (i, value)))
            .collect();
        Windows { universe, segments }
    }
}

/// Clips, sorts, and merges overlapping or touching key ranges.
fn normalize_ranges(intervals: &[Interval], universe: KeyRange) -> Vec<KeyRange> {
    let mut ranges: Vec<KeyRange> = intervals
        .iter()
        .map(|i| {
            let (lo, hi) = i.keys();
            (lo.max(universe.0), hi.min(universe.1))
        })
        .filter(|(lo, hi)| lo < hi)
        .collect();
    ranges.sort_unstable();

    let mut merged: Vec<KeyRange> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

impl Windows {
    /// A single segment of `value` over the whole universe.
    pub fn new(universe: Interval, value: bool) -> Self {
        Windows { universe, segments: vec![(universe, value)] }
    }

    /// False everywhere except on `intervals`, clipped to the universe.
    pub fn from_true_intervals(universe: Interval, intervals: &[Interval]) -> Self {
        Self::new(universe, false).set(intervals, true)
    }

    pub fn universe(&self) -> Interval {
        self.universe
    }

    pub fn segments(&self) -> &[(Interval, bool)] {
        &self.segments
    }

    pub(crate) fn keyed(&self) -> impl Iterator<Item = (i128, i128, bool)> + '_ {
        self.segments.iter().map(|(interval, value)| {
            let (lo, hi) = interval.keys();
            (lo, hi, *value)
        })
    }

    /// Overwrites `intervals` (clipped to the universe) with `value`.
    pub fn set(&self, intervals: &[Interval], value: bool) -> Windows {
        let overrides = normalize_ranges(intervals, self.universe.keys());
        let mut builder = KeyedBuilder::default();
        let mut j = 0;

        for (lo, hi, existing) in self.keyed() {
            let mut cursor = lo;
            while cursor < hi {
                while j < overrides.len() && overrides[j].1 <= cursor {
                    j += 1;
                }
                match overrides.get(j) {
                    Some(&(o_lo, o_hi)) if o_lo <= cursor => {
                        let end = hi.min(o_hi);
                        builder.push(cursor, end, value);
                        cursor = end;
                    }
                    Some(&(o_lo, _)) => {
                        let end = hi.min(o_lo);
                        builder.push(cursor, end, existing);
                        cursor = end;
                    }
                    None => {
                        builder.push(cursor, hi, existing);
                        cursor = hi;
                    }
                }
            }
        }
        builder.finish(self.universe)
    }

    /// Pointwise combination over the shared part of both universes.
    ///
    /// Returns `None` when the universes share no instant.
    pub fn combine(&self, other: &Windows, op: impl Fn(bool, bool) -> bool) -> Option<Windows> {
        let universe = self.universe.intersect(&other.universe)?;
        let (u_lo, u_hi) = universe.keys();
        let left: Vec<_> = self.keyed().collect();
        let right: Vec<_> = other.keyed().collect();

        let mut builder = KeyedBuilder::default();
        let (mut i, mut j) = (0, 0);
        let mut cursor = u_lo;
        while cursor < u_hi {
            while i < left.len() && left[i].1 <= cursor {
                i += 1;
            }
            while j < right.len() && right[j].1 <= cursor {
                j += 1;
            }
            let (Some(a), Some(b)) = (left.get(i), right.get(j)) else { break };
            let end = a.1.min(b.1).min(u_hi);
            builder.push(cursor, end, op(a.2, b.2));
            cursor = end;
        }
        Some(builder.finish(universe))
    }

    pub fn union(&self, other: &Windows) -> Option<Windows> {
        self.combine(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &Windows) -> Option<Windows> {
        self.combine(other, |a, b| a && b)
    }

    /// True where this is true and `other` is false.
    pub fn minus(&self, other: &Windows) -> Option<Windows> {
        self.combine(other, |a, b| a && !b)
    }

    pub fn complement(&self) -> Windows {
        let mut builder = KeyedBuilder::default();
        for (lo, hi, value) in self.keyed() {
            builder.push(lo, hi, !value);
        }
        builder.finish(self.universe)
    }

    /// True if every true instant of `other` is also true here.
    pub fn contains(&self, other: &Windows) -> bool {
        other.true_intervals().all(|t| self.universe.contains(&t))
            && other
                .minus(self)
                .map_or(true, |difference| !difference.any_true())
    }

    /// `None` if `point` is outside the universe.
    pub fn value_at(&self, point: Duration) -> Option<bool> {
        let key = Interval::point_key(point);
        let idx = self.segments.partition_point(|(interval, _)| interval.keys().1 <= key);
        self.segments
            .get(idx)
            .filter(|(interval, _)| interval.keys().0 <= key)
            .map(|(_, value)| *value)
    }

    /// Restricts the universe to `bounds`.
    pub fn crop(&self, bounds: Interval) -> Option<Windows> {
        self.combine(&Windows::new(bounds, true), |a, _| a)
    }

    pub fn any_true(&self) -> bool {
        self.segments.iter().any(|(_, value)| *value)
    }

    pub fn true_intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.segments.iter().filter(|(_, v)| *v).map(|(i, _)| *i)
    }

    pub fn false_intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.segments.iter().filter(|(_, v)| !*v).map(|(i, _)| *i)
    }

    /// Running total of true time, in multiples of `unit`, starting at zero.
    pub fn accumulated_duration(&self, unit: Duration) -> LinearProfile {
        let rate_while_true = Duration::SECOND.ratio_of(unit);
        let mut total = 0.0;
        let mut segments = Vec::with_capacity(self.segments.len());
        for (interval, value) in &self.segments {
            let rate = if *value { rate_while_true } else { 0.0 };
            segments.push((*interval, LinearDynamics::new(total, rate)));
            if *value {
                total += interval.duration().ratio_of(unit);
            }
        }
        LinearProfile::from_canonical(self.universe, segments)
    }

    // --- Duration Filters ---

    /// Keeps only true runs strictly longer than `duration`.
    pub fn longer_than(&self, duration: Duration) -> Windows {
        let short: Vec<_> = self.true_intervals().filter(|i| i.duration() <= duration).collect();
        self.set(&short, false)
    }

    /// Keeps only true runs strictly shorter than `duration`.
    pub fn shorter_than(&self, duration: Duration) -> Windows {
        let long: Vec<_> = self.true_intervals().filter(|i| i.duration() >= duration).collect();
        self.set(&long, false)
    }

    // --- Edges ---

    /// True only at the first instant of each true run.
    pub fn starts(&self) -> Windows {
        let points: Vec<_> = self.true_intervals().map(|i| Interval::at(i.start())).collect();
        Windows::from_true_intervals(self.universe, &points)
    }

    /// True only at the last instant of each true run.
    pub fn ends(&self) -> Windows {
        let points: Vec<_> = self.true_intervals().map(|i| Interval::at(i.end())).collect();
        Windows::from_true_intervals(self.universe, &points)
    }

    /// Moves every true run's start by `from_start` and its end by `from_end`.
    /// Runs that become empty disappear; runs that come to overlap merge.
    pub fn shift_edges(&self, from_start: Duration, from_end: Duration) -> Windows {
        let shifted: Vec<_> = self
            .true_intervals()
            .filter_map(|i| i.shift_by(from_start, from_end))
            .collect();
        Windows::from_true_intervals(self.universe, &shifted)
    }
}
