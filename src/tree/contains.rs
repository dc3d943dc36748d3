//! Containment checks between a set of parent spans and a set of child spans.
use super::{indent, DurationExpression, EvaluationError, Expression, SpansExpression};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::profile::LinearProfile;
use crate::time::{Duration, Interval, Windows};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Bounds each parent must satisfy. With every field empty, a parent needs at least
/// one contained child.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainsRequirement {
    pub min_count: Option<usize>,
    pub max_count: Option<usize>,
    pub min_duration: Option<DurationExpression>,
    pub max_duration: Option<DurationExpression>,
}

impl ContainsRequirement {
    pub fn at_least(min_count: usize) -> Self {
        Self { min_count: Some(min_count), ..Self::default() }
    }

    fn is_unconstrained(&self) -> bool {
        self.min_count.is_none() && self.max_count.is_none() && self.min_duration.is_none() && self.max_duration.is_none()
    }
}

/// False on every parent interval that fails the requirement, true elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct SpansContains {
    pub parents: SpansExpression,
    pub children: SpansExpression,
    pub requirement: ContainsRequirement,
}

impl Expression for SpansContains {
    type Output = Windows;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<Windows, EvaluationError> {
        let parents: Vec<Interval> = self.parents.evaluate(results, bounds, environment)?.intervals().collect();
        let children_spans = self.children.evaluate(results, bounds, environment)?;
        let children: Vec<Interval> = children_spans.intervals().collect();

        let eval_duration = |d: &Option<DurationExpression>| {
            d.as_ref().map(|d| d.evaluate(results, bounds, environment)).transpose()
        };
        let min_duration = eval_duration(&self.requirement.min_duration)?;
        let max_duration = eval_duration(&self.requirement.max_duration)?;
        let min_count = if self.requirement.is_unconstrained() { Some(1) } else { self.requirement.min_count };
        let max_count = self.requirement.max_count;

        // Child time inside a parent, sampled from the running total at its edges.
        let accumulated = (min_duration.is_some() || max_duration.is_some())
            .then(|| children_spans.accumulated_duration(bounds, Duration::MICROSECOND));

        let mut failing = Vec::new();
        let mut child_index = 0;
        for parent in &parents {
            // 1. Children starting before this parent can never be contained by it or any later parent.
            while child_index < children.len() && children[child_index].compare_starts(parent) == Ordering::Less {
                child_index += 1;
            }

            // 2. Count with a separate cursor so overlapping parents can share children.
            let mut count = 0;
            for child in &children[child_index..] {
                if parent.contains(child) {
                    count += 1;
                } else if parent.compare_end_to_start(child) != Ordering::Greater {
                    break;
                }
            }

            // 3. Check the requirement.
            let mut satisfied = min_count.map_or(true, |min| count >= min) && max_count.map_or(true, |max| count <= max);
            if let Some(inside) = accumulated.as_ref().and_then(|profile| child_time_within(profile, parent)) {
                satisfied &= min_duration.map_or(true, |min| inside >= min.micros() as f64);
                satisfied &= max_duration.map_or(true, |max| inside <= max.micros() as f64);
            }
            if !satisfied {
                failing.push(*parent);
            }
        }

        Ok(Windows::new(bounds, true).set(&failing, false))
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        self.parents.extract_resources(names);
        self.children.extract_resources(names);
    }

    fn pretty_print(&self, prefix: &str) -> String {
        let inner = indent(prefix);
        let bound = |label: &str, value: Option<String>| {
            value.map(|v| format!("\n{}({} {})", inner, label, v)).unwrap_or_default()
        };
        let duration = |d: &Option<DurationExpression>| d.as_ref().map(|d| d.pretty_print("").trim_start().to_string());
        format!(
            "\n{}(contains{}{}{}{}{}{})",
            prefix,
            self.parents.pretty_print(&inner),
            self.children.pretty_print(&inner),
            bound("min-count", self.requirement.min_count.map(|c| c.to_string())),
            bound("max-count", self.requirement.max_count.map(|c| c.to_string())),
            bound("min-duration", duration(&self.requirement.min_duration)),
            bound("max-duration", duration(&self.requirement.max_duration)),
        )
    }
}

/// Child time inside `parent`, read off the running total at the edges of the part
/// of `parent` the total covers. `None` when they share no instant.
fn child_time_within(accumulated: &LinearProfile, parent: &Interval) -> Option<f64> {
    let covered = parent.intersect(&accumulated.universe())?;
    let end = accumulated.value_at_closure(covered.end())?;
    let start = accumulated.value_at_closure(covered.start())?;
    Some(end - start)
}
