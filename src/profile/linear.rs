//! Piecewise-linear real-valued profiles and their comparisons.
//!
//! Comparisons work on the difference `d(t) = left(t) - right(t)` of two profiles,
//! re-segmented onto the union of their boundaries. Within a piece `d` is linear, so
//! the set where a comparison holds is a prefix or suffix of the piece, split at the
//! exact crossing instant.
use super::segments::{Dynamics, Profile};
use crate::time::windows::KeyedBuilder;
use crate::time::{Duration, Interval, Windows};
use serde::{Deserialize, Serialize};

/// Tolerance for treating floating values and crossing instants as exact.
const EPSILON: f64 = 1e-9;
/// Crossing times within this many ticks of an integer snap to it.
const TICK_SNAP: f64 = 1e-6;
const TICKS_PER_SECOND: f64 = Duration::SECOND.micros() as f64;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// `value(t) = initial + rate * (t - segment start)`, with `rate` per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearDynamics {
    pub initial: f64,
    pub rate: f64,
}

impl LinearDynamics {
    pub fn new(initial: f64, rate: f64) -> Self {
        LinearDynamics { initial, rate }
    }

    pub fn constant(value: f64) -> Self {
        LinearDynamics { initial: value, rate: 0.0 }
    }

    pub fn value_after(&self, elapsed: Duration) -> f64 {
        self.initial + self.rate * elapsed.as_secs_f64()
    }

    /// Whether the line moves by no more than the tolerance across `interval`.
    fn is_flat_over(&self, interval: Interval) -> bool {
        self.rate == 0.0 || (self.rate * interval.duration().as_secs_f64()).abs() <= EPSILON
    }

    /// Tick where the line crosses zero, and whether that tick is an exact integer.
    fn zero_crossing(&self, anchor: Duration) -> (f64, bool) {
        let crossing = anchor.micros() as f64 + (-self.initial / self.rate) * TICKS_PER_SECOND;
        let snapped = crossing.round();
        if (crossing - snapped).abs() < TICK_SNAP {
            (snapped, true)
        } else {
            (crossing, false)
        }
    }
}

impl Dynamics for LinearDynamics {
    fn rebase(&self, elapsed: Duration) -> Self {
        LinearDynamics { initial: self.value_after(elapsed), rate: self.rate }
    }
}

pub type LinearProfile = Profile<LinearDynamics>;

fn clamp_key(key: f64, lo: i128, hi: i128) -> i128 {
    if key <= lo as f64 {
        lo
    } else if key >= hi as f64 {
        hi
    } else {
        key as i128
    }
}

/// Joins neighbouring pieces that lie on one line, so boundaries introduced only by
/// re-segmentation do not hide a crossing.
fn coalesce_lines(pieces: Vec<(Interval, LinearDynamics)>) -> Vec<(Interval, LinearDynamics)> {
    let mut joined: Vec<(Interval, LinearDynamics)> = Vec::with_capacity(pieces.len());
    for (interval, dynamics) in pieces {
        if let Some((last_interval, last_dynamics)) = joined.last_mut() {
            let continued = last_dynamics.rebase(interval.start() - last_interval.start());
            let drift = (continued.rate - dynamics.rate) * interval.duration().as_secs_f64();
            if approx_eq(continued.initial, dynamics.initial) && drift.abs() <= EPSILON {
                if let Some(span) = Interval::from_keys((last_interval.keys().0, interval.keys().1)) {
                    *last_interval = span;
                    continue;
                }
            }
        }
        joined.push((interval, dynamics));
    }
    joined
}

/// Marks where `d < 0` within one piece.
fn push_negative_part(builder: &mut KeyedBuilder, interval: Interval, d: LinearDynamics) {
    let (lo, hi) = interval.keys();
    if d.is_flat_over(interval) {
        builder.push(lo, hi, d.initial < -EPSILON);
        return;
    }
    let (crossing, exact) = d.zero_crossing(interval.start());
    if d.rate < 0.0 {
        // Negative after the crossing. An exact crossing instant is zero, not negative.
        let boundary = if exact { 2.0 * crossing + 1.0 } else { 2.0 * crossing.ceil() };
        let split = clamp_key(boundary, lo, hi);
        builder.push(lo, split, false);
        builder.push(split, hi, true);
    } else {
        let boundary = if exact { 2.0 * crossing } else { 2.0 * crossing.floor() + 1.0 };
        let split = clamp_key(boundary, lo, hi);
        builder.push(lo, split, true);
        builder.push(split, hi, false);
    }
}

/// Marks where `d == 0` within one piece. A ramp only touches zero at a crossing
/// instant strictly after the piece start.
fn push_zero_part(builder: &mut KeyedBuilder, interval: Interval, d: LinearDynamics) {
    let (lo, hi) = interval.keys();
    if d.is_flat_over(interval) {
        builder.push(lo, hi, approx_eq(d.initial, 0.0));
        return;
    }
    let (crossing, exact) = d.zero_crossing(interval.start());
    if exact {
        let key = clamp_key(2.0 * crossing, lo, hi);
        if key > lo && key < hi {
            builder.push(lo, key, false);
            builder.push(key, key + 1, true);
            builder.push(key + 1, hi, false);
            return;
        }
    }
    builder.push(lo, hi, false);
}

impl Profile<LinearDynamics> {
    pub fn constant_value(universe: Interval, value: f64) -> Self {
        Profile::constant(universe, LinearDynamics::constant(value))
    }

    pub fn value_at(&self, point: Duration) -> Option<f64> {
        self.segment_at(point)
            .map(|(interval, dynamics)| dynamics.value_after(point - interval.start()))
    }

    /// Like `value_at`, but also answers at an endpoint the universe excludes by
    /// extending the neighbouring segment's line up to it.
    pub fn value_at_closure(&self, point: Duration) -> Option<f64> {
        if let Some(value) = self.value_at(point) {
            return Some(value);
        }
        let universe = self.universe();
        let edge = if point == universe.end() {
            self.segments().last()
        } else if point == universe.start() {
            self.segments().first()
        } else {
            None
        };
        edge.map(|(interval, dynamics)| dynamics.value_after(point - interval.start()))
    }

    // --- Arithmetic ---

    pub fn plus(&self, other: &LinearProfile) -> Option<LinearProfile> {
        let (universe, pieces) = self.zip_with(other, |_, l, r| {
            LinearDynamics::new(l.initial + r.initial, l.rate + r.rate)
        })?;
        Some(Profile::from_canonical(universe, pieces))
    }

    pub fn minus(&self, other: &LinearProfile) -> Option<LinearProfile> {
        self.plus(&other.negate())
    }

    pub fn times(&self, scalar: f64) -> LinearProfile {
        self.map(|d| LinearDynamics::new(d.initial * scalar, d.rate * scalar))
    }

    pub fn negate(&self) -> LinearProfile {
        self.times(-1.0)
    }

    /// The piecewise-constant derivative, per second.
    pub fn rate(&self) -> LinearProfile {
        self.map(|d| LinearDynamics::constant(d.rate))
    }

    // --- Comparisons ---

    fn difference(&self, other: &LinearProfile) -> Option<(Interval, Vec<(Interval, LinearDynamics)>)> {
        let (universe, pieces) = self.zip_with(other, |_, l, r| {
            LinearDynamics::new(l.initial - r.initial, l.rate - r.rate)
        })?;
        Some((universe, coalesce_lines(pieces)))
    }

    fn scan_difference(
        &self,
        other: &LinearProfile,
        mark: fn(&mut KeyedBuilder, Interval, LinearDynamics),
    ) -> Option<Windows> {
        let (universe, pieces) = self.difference(other)?;
        let mut builder = KeyedBuilder::default();
        for (interval, d) in pieces {
            mark(&mut builder, interval, d);
        }
        Some(builder.finish(universe))
    }

    /// `None` when the universes share no instant, as for every comparison below.
    pub fn less_than(&self, other: &LinearProfile) -> Option<Windows> {
        self.scan_difference(other, push_negative_part)
    }

    pub fn greater_than(&self, other: &LinearProfile) -> Option<Windows> {
        other.less_than(self)
    }

    pub fn less_than_or_equal(&self, other: &LinearProfile) -> Option<Windows> {
        self.greater_than(other).map(|w| w.complement())
    }

    pub fn greater_than_or_equal(&self, other: &LinearProfile) -> Option<Windows> {
        self.less_than(other).map(|w| w.complement())
    }

    /// A ramp that starts exactly at the other side's value is not equal at its first
    /// instant, even though `<=` and `>=` both hold there.
    pub fn equal_to(&self, other: &LinearProfile) -> Option<Windows> {
        self.scan_difference(other, push_zero_part)
    }

    pub fn not_equal_to(&self, other: &LinearProfile) -> Option<Windows> {
        self.equal_to(other).map(|w| w.complement())
    }

    fn as_constant(&self, value: f64) -> LinearProfile {
        Profile::constant_value(self.universe(), value)
    }

    pub fn equal_to_value(&self, value: f64) -> Windows {
        self.equal_to(&self.as_constant(value)).unwrap_or_else(|| Windows::new(self.universe(), false))
    }

    pub fn less_than_value(&self, value: f64) -> Windows {
        self.less_than(&self.as_constant(value)).unwrap_or_else(|| Windows::new(self.universe(), false))
    }

    pub fn greater_than_value(&self, value: f64) -> Windows {
        self.greater_than(&self.as_constant(value)).unwrap_or_else(|| Windows::new(self.universe(), false))
    }
}
