//! Boolean-valued expressions.
use super::{
    indent, DiscreteExpression, DurationExpression, EvaluationError, Expression, RealExpression, SpansContains,
    SpansExpression,
};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::time::{Interval, Windows};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    fn symbol(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
            Comparison::Equal => "=",
            Comparison::NotEqual => "!=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowsExpression {
    Value(bool),
    /// True while the activity bound to `alias` is running.
    ActivityWindow { alias: String },
    Not(Box<WindowsExpression>),
    And(Vec<WindowsExpression>),
    Or(Vec<WindowsExpression>),
    RealComparison { op: Comparison, left: Box<RealExpression>, right: Box<RealExpression> },
    DiscreteEqual { left: DiscreteExpression, right: DiscreteExpression },
    DiscreteNotEqual { left: DiscreteExpression, right: DiscreteExpression },
    DiscreteChanges(DiscreteExpression),
    FromSpans(Box<SpansExpression>),
    Contains(Box<SpansContains>),
    LongerThan { windows: Box<WindowsExpression>, duration: DurationExpression },
    ShorterThan { windows: Box<WindowsExpression>, duration: DurationExpression },
    Starts(Box<WindowsExpression>),
    Ends(Box<WindowsExpression>),
    ShiftEdges { windows: Box<WindowsExpression>, from_start: DurationExpression, from_end: DurationExpression },
}

impl WindowsExpression {
    pub fn compare(op: Comparison, left: RealExpression, right: RealExpression) -> Self {
        WindowsExpression::RealComparison { op, left: Box::new(left), right: Box::new(right) }
    }

    pub fn not(windows: WindowsExpression) -> Self {
        WindowsExpression::Not(Box::new(windows))
    }
}

fn disjoint(operation: &'static str) -> EvaluationError {
    EvaluationError::DisjointBounds { operation }
}

impl Expression for WindowsExpression {
    type Output = Windows;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<Windows, EvaluationError> {
        let eval = |expr: &WindowsExpression| expr.evaluate(results, bounds, environment);
        let eval_duration = |expr: &DurationExpression| expr.evaluate(results, bounds, environment);

        match self {
            WindowsExpression::Value(value) => Ok(Windows::new(bounds, *value)),
            WindowsExpression::ActivityWindow { alias } => {
                let instance = environment
                    .activity(alias)
                    .ok_or_else(|| EvaluationError::UnboundAlias { alias: alias.clone() })?;
                Ok(Windows::from_true_intervals(bounds, &[instance.interval]))
            }
            WindowsExpression::Not(inner) => Ok(eval(inner)?.complement()),
            WindowsExpression::And(operands) => {
                let mut acc = Windows::new(bounds, true);
                for operand in operands {
                    acc = acc.intersection(&eval(operand)?).ok_or_else(|| disjoint("and"))?;
                }
                Ok(acc)
            }
            WindowsExpression::Or(operands) => {
                let mut acc = Windows::new(bounds, false);
                for operand in operands {
                    acc = acc.union(&eval(operand)?).ok_or_else(|| disjoint("or"))?;
                }
                Ok(acc)
            }
            WindowsExpression::RealComparison { op, left, right } => {
                let left = left.evaluate(results, bounds, environment)?;
                let right = right.evaluate(results, bounds, environment)?;
                let windows = match op {
                    Comparison::LessThan => left.less_than(&right),
                    Comparison::LessThanOrEqual => left.less_than_or_equal(&right),
                    Comparison::GreaterThan => left.greater_than(&right),
                    Comparison::GreaterThanOrEqual => left.greater_than_or_equal(&right),
                    Comparison::Equal => left.equal_to(&right),
                    Comparison::NotEqual => left.not_equal_to(&right),
                };
                windows.ok_or_else(|| disjoint(op.symbol()))
            }
            WindowsExpression::DiscreteEqual { left, right } => {
                let left = left.evaluate(results, bounds, environment)?;
                let right = right.evaluate(results, bounds, environment)?;
                left.equal_to(&right).ok_or_else(|| disjoint("="))
            }
            WindowsExpression::DiscreteNotEqual { left, right } => {
                let left = left.evaluate(results, bounds, environment)?;
                let right = right.evaluate(results, bounds, environment)?;
                left.not_equal_to(&right).ok_or_else(|| disjoint("!="))
            }
            WindowsExpression::DiscreteChanges(profile) => {
                Ok(profile.evaluate(results, bounds, environment)?.changes())
            }
            WindowsExpression::FromSpans(spans) => {
                Ok(spans.evaluate(results, bounds, environment)?.to_windows(bounds))
            }
            WindowsExpression::Contains(contains) => contains.evaluate(results, bounds, environment),
            WindowsExpression::LongerThan { windows, duration } => {
                Ok(eval(windows)?.longer_than(eval_duration(duration)?))
            }
            WindowsExpression::ShorterThan { windows, duration } => {
                Ok(eval(windows)?.shorter_than(eval_duration(duration)?))
            }
            WindowsExpression::Starts(windows) => Ok(eval(windows)?.starts()),
            WindowsExpression::Ends(windows) => Ok(eval(windows)?.ends()),
            WindowsExpression::ShiftEdges { windows, from_start, from_end } => {
                Ok(eval(windows)?.shift_edges(eval_duration(from_start)?, eval_duration(from_end)?))
            }
        }
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        match self {
            WindowsExpression::Value(_) | WindowsExpression::ActivityWindow { .. } => {}
            WindowsExpression::Not(inner)
            | WindowsExpression::Starts(inner)
            | WindowsExpression::Ends(inner)
            | WindowsExpression::LongerThan { windows: inner, .. }
            | WindowsExpression::ShorterThan { windows: inner, .. }
            | WindowsExpression::ShiftEdges { windows: inner, .. } => inner.extract_resources(names),
            WindowsExpression::And(operands) | WindowsExpression::Or(operands) => {
                operands.iter().for_each(|o| o.extract_resources(names))
            }
            WindowsExpression::RealComparison { left, right, .. } => {
                left.extract_resources(names);
                right.extract_resources(names);
            }
            WindowsExpression::DiscreteEqual { left, right } | WindowsExpression::DiscreteNotEqual { left, right } => {
                left.extract_resources(names);
                right.extract_resources(names);
            }
            WindowsExpression::DiscreteChanges(profile) => profile.extract_resources(names),
            WindowsExpression::FromSpans(spans) => spans.extract_resources(names),
            WindowsExpression::Contains(contains) => contains.extract_resources(names),
        }
    }

    fn pretty_print(&self, prefix: &str) -> String {
        let inner = indent(prefix);
        let list = |operands: &[WindowsExpression]| operands.iter().map(|o| o.pretty_print(&inner)).collect::<String>();
        match self {
            WindowsExpression::Value(value) => format!("\n{}{}", prefix, value),
            WindowsExpression::ActivityWindow { alias } => format!("\n{}(during {})", prefix, alias),
            WindowsExpression::Not(windows) => format!("\n{}(not{})", prefix, windows.pretty_print(&inner)),
            WindowsExpression::And(operands) => format!("\n{}(and{})", prefix, list(operands)),
            WindowsExpression::Or(operands) => format!("\n{}(or{})", prefix, list(operands)),
            WindowsExpression::RealComparison { op, left, right } => format!(
                "\n{}({}{}{})",
                prefix,
                op.symbol(),
                left.pretty_print(&inner),
                right.pretty_print(&inner)
            ),
            WindowsExpression::DiscreteEqual { left, right } => {
                format!("\n{}(={}{})", prefix, left.pretty_print(&inner), right.pretty_print(&inner))
            }
            WindowsExpression::DiscreteNotEqual { left, right } => {
                format!("\n{}(!={}{})", prefix, left.pretty_print(&inner), right.pretty_print(&inner))
            }
            WindowsExpression::DiscreteChanges(profile) => format!("\n{}(changes{})", prefix, profile.pretty_print(&inner)),
            WindowsExpression::FromSpans(spans) => format!("\n{}(windows-of{})", prefix, spans.pretty_print(&inner)),
            WindowsExpression::Contains(contains) => contains.pretty_print(prefix),
            WindowsExpression::LongerThan { windows, duration } => format!(
                "\n{}(longer-than{}{})",
                prefix,
                windows.pretty_print(&inner),
                duration.pretty_print(&inner)
            ),
            WindowsExpression::ShorterThan { windows, duration } => format!(
                "\n{}(shorter-than{}{})",
                prefix,
                windows.pretty_print(&inner),
                duration.pretty_print(&inner)
            ),
            WindowsExpression::Starts(windows) => format!("\n{}(starts{})", prefix, windows.pretty_print(&inner)),
            WindowsExpression::Ends(windows) => format!("\n{}(ends{})", prefix, windows.pretty_print(&inner)),
            WindowsExpression::ShiftEdges { windows, from_start, from_end } => format!(
                "\n{}(shift-edges{}{}{})",
                prefix,
                windows.pretty_print(&inner),
                from_start.pretty_print(&inner),
                from_end.pretty_print(&inner)
            ),
        }
    }
}
