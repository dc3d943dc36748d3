//! Piecewise-constant profiles over arbitrary serialized values.
use super::linear::{LinearDynamics, LinearProfile};
use super::segments::Profile;
use super::value::SerializedValue;
use crate::time::windows::KeyedBuilder;
use crate::time::{Duration, Interval, Windows};

pub type DiscreteProfile = Profile<SerializedValue>;

impl Profile<SerializedValue> {
    pub fn value_at(&self, point: Duration) -> Option<&SerializedValue> {
        self.segment_at(point).map(|(_, value)| value)
    }

    /// True wherever both profiles hold the same value. `None` for disjoint universes.
    pub fn equal_to(&self, other: &DiscreteProfile) -> Option<Windows> {
        let (universe, pieces) = self.zip_with(other, |_, l, r| l == r)?;
        let mut builder = KeyedBuilder::default();
        for (interval, equal) in pieces {
            let (lo, hi) = interval.keys();
            builder.push(lo, hi, equal);
        }
        Some(builder.finish(universe))
    }

    pub fn not_equal_to(&self, other: &DiscreteProfile) -> Option<Windows> {
        self.equal_to(other).map(|w| w.complement())
    }

    pub fn equal_to_value(&self, value: &SerializedValue) -> Windows {
        let mut builder = KeyedBuilder::default();
        for (interval, held) in self.segments() {
            let (lo, hi) = interval.keys();
            builder.push(lo, hi, held == value);
        }
        builder.finish(self.universe())
    }

    /// True at each instant where a segment begins with a different value than its predecessor.
    pub fn changes(&self) -> Windows {
        let points: Vec<Interval> = self
            .segments()
            .windows(2)
            .filter(|pair| pair[0].1 != pair[1].1)
            .map(|pair| Interval::at(pair[1].0.start()))
            .collect();
        Windows::from_true_intervals(self.universe(), &points)
    }

    /// A step-shaped linear profile, if every value is numeric.
    pub fn as_linear(&self) -> Option<LinearProfile> {
        let segments = self
            .segments()
            .iter()
            .map(|(interval, value)| value.as_real().map(|v| (*interval, LinearDynamics::constant(v))))
            .collect::<Option<Vec<_>>>()?;
        Some(Profile::from_canonical(self.universe(), segments))
    }
}
