//! Possibly-overlapping intervals, each optionally attributed to an activity instance.
use super::duration::Duration;
use super::interval::Interval;
use super::windows::Windows;
use crate::model::SimulationResults;
use crate::profile::{LinearDynamics, LinearProfile};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    pub interval: Interval,
    pub activity_id: Option<i64>,
}

impl Span {
    pub fn new(interval: Interval) -> Self {
        Span { interval, activity_id: None }
    }

    pub fn of_activity(interval: Interval, activity_id: i64) -> Self {
        Span { interval, activity_id: Some(activity_id) }
    }
}

/// Spans ordered by start. Equal starts keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spans {
    spans: Vec<Span>,
}

impl Spans {
    pub fn new(spans: impl IntoIterator<Item = Span>) -> Self {
        let mut spans: Vec<Span> = spans.into_iter().collect();
        spans.sort_by(|a, b| a.interval.compare_starts(&b.interval));
        Spans { spans }
    }

    /// Every instance of `activity_type`, cropped to `bounds` and attributed to its id.
    pub fn of_activities(results: &SimulationResults, activity_type: &str, bounds: Interval) -> Self {
        Spans::new(
            results
                .activities_of_type(activity_type)
                .filter_map(|a| a.interval.intersect(&bounds).map(|i| Span::of_activity(i, a.id))),
        )
    }

    /// One unattributed span per true run.
    pub fn from_windows(windows: &Windows) -> Self {
        Spans { spans: windows.true_intervals().map(Span::new).collect() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.spans.iter().map(|s| s.interval)
    }

    /// Joins several collections with a single sort. Equal starts keep the order of
    /// the collections they came from.
    pub fn concat(collections: impl IntoIterator<Item = Spans>) -> Self {
        Spans::new(collections.into_iter().flat_map(|c| c.spans))
    }

    /// Collapses overlaps: true wherever at least one span is present.
    pub fn to_windows(&self, universe: Interval) -> Windows {
        let intervals: Vec<_> = self.intervals().collect();
        Windows::from_true_intervals(universe, &intervals)
    }

    /// Running total of covered time in multiples of `unit`. Overlapping spans accumulate
    /// in parallel, so the rate at any instant is the number of spans covering it.
    pub fn accumulated_duration(&self, universe: Interval, unit: Duration) -> LinearProfile {
        let per_span_rate = Duration::SECOND.ratio_of(unit);
        let mut events: Vec<(Duration, i64)> = self
            .spans
            .iter()
            .filter(|s| !s.interval.is_point())
            .flat_map(|s| [(s.interval.start(), 1), (s.interval.end(), -1)])
            .collect();
        events.sort_unstable();

        let (u_lo, u_hi) = universe.keys();
        let mut idx = 0;
        let mut active = 0i64;
        while idx < events.len() && events[idx].0 <= universe.start() {
            active += events[idx].1;
            idx += 1;
        }

        let mut segments = Vec::new();
        let mut total = 0.0;
        let mut cursor_key = u_lo;
        let mut cursor_tick = universe.start();
        loop {
            let next_tick = events.get(idx).map(|e| e.0).filter(|t| *t < universe.end());
            let piece_hi = next_tick.map_or(u_hi, Interval::point_key);
            if let Some(interval) = Interval::from_keys((cursor_key, piece_hi)) {
                segments.push((interval, LinearDynamics::new(total, active as f64 * per_span_rate)));
            }
            let Some(tick) = next_tick else { break };
            total += active as f64 * (tick - cursor_tick).ratio_of(unit);
            cursor_tick = tick;
            cursor_key = piece_hi;
            while idx < events.len() && events[idx].0 == tick {
                active += events[idx].1;
                idx += 1;
            }
        }
        LinearProfile::from_canonical(universe, segments)
    }

    /// Cuts every span down to the parts where `windows` is true, keeping attribution.
    pub fn select_when_true(&self, windows: &Windows) -> Spans {
        let true_runs: Vec<Interval> = windows.true_intervals().collect();
        let mut selected = Vec::new();
        for span in &self.spans {
            let first = true_runs.partition_point(|run| run.compare_end_to_start(&span.interval).is_le());
            for run in &true_runs[first..] {
                if span.interval.compare_end_to_start(run).is_le() {
                    break;
                }
                if let Some(piece) = span.interval.intersect(run) {
                    selected.push(Span { interval: piece, activity_id: span.activity_id });
                }
            }
        }
        Spans::new(selected)
    }

    pub fn starts(&self) -> Spans {
        self.map_intervals(|i| Some(Interval::at(i.start())))
    }

    pub fn ends(&self) -> Spans {
        self.map_intervals(|i| Some(Interval::at(i.end())))
    }

    pub fn shift_by(&self, from_start: Duration, from_end: Duration) -> Spans {
        self.map_intervals(|i| i.shift_by(from_start, from_end))
    }

    fn map_intervals(&self, f: impl Fn(&Interval) -> Option<Interval>) -> Spans {
        Spans::new(self.spans.iter().filter_map(|s| {
            f(&s.interval).map(|interval| Span { interval, activity_id: s.activity_id })
        }))
    }
}

impl FromIterator<Span> for Spans {
    fn from_iter<T: IntoIterator<Item = Span>>(iter: T) -> Self {
        Spans::new(iter)
    }
}
