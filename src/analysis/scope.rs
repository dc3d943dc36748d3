//! Static alias check run on compiled constraints before any evaluation.
//!
//! Walks the tree depth-first with the stack of aliases bound by enclosing iteration
//! nodes and reports every activity reference that nothing binds.
use crate::tree::{
    ConstraintExpression, DurationExpression, RealExpression, SpansContains, SpansExpression, WindowsExpression,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Alias '{alias}' is used at {path} but no enclosing iteration binds it")]
pub struct ScopeError {
    pub alias: String,
    /// Node names from the root down to the offending reference.
    pub path: String,
}

pub struct ScopeChecker {
    bound: Vec<String>,
    path: Vec<&'static str>,
    errors: Vec<ScopeError>,
}

impl ScopeChecker {
    /// Checks a whole constraint, collecting every unbound reference.
    pub fn check(constraint: &ConstraintExpression) -> Result<(), Vec<ScopeError>> {
        let mut checker = ScopeChecker { bound: Vec::new(), path: Vec::new(), errors: Vec::new() };
        checker.constraint(constraint);
        if checker.errors.is_empty() {
            Ok(())
        } else {
            Err(checker.errors)
        }
    }

    fn reference(&mut self, alias: &str) {
        if !self.bound.iter().any(|b| b == alias) {
            self.errors.push(ScopeError { alias: alias.to_string(), path: self.path.join(" > ") });
        }
    }

    fn enter(&mut self, node: &'static str) {
        self.path.push(node);
    }

    fn leave(&mut self) {
        self.path.pop();
    }

    fn constraint(&mut self, expr: &ConstraintExpression) {
        match expr {
            ConstraintExpression::ViolationsOf(windows) => {
                self.enter("violations-of");
                self.windows(windows);
                self.leave();
            }
            ConstraintExpression::ForEachActivityViolations { alias, expression, .. } => {
                self.enter("for-each-activity");
                self.bound.push(alias.clone());
                self.constraint(expression);
                self.bound.pop();
                self.leave();
            }
        }
    }

    fn windows(&mut self, expr: &WindowsExpression) {
        match expr {
            WindowsExpression::Value(_) => {}
            WindowsExpression::ActivityWindow { alias } => {
                self.enter("during");
                self.reference(alias);
                self.leave();
            }
            WindowsExpression::Not(inner) | WindowsExpression::Starts(inner) | WindowsExpression::Ends(inner) => {
                self.windows(inner)
            }
            WindowsExpression::And(operands) | WindowsExpression::Or(operands) => {
                operands.iter().for_each(|o| self.windows(o))
            }
            WindowsExpression::RealComparison { left, right, .. } => {
                self.real(left);
                self.real(right);
            }
            WindowsExpression::DiscreteEqual { .. }
            | WindowsExpression::DiscreteNotEqual { .. }
            | WindowsExpression::DiscreteChanges(_) => {}
            WindowsExpression::FromSpans(spans) => self.spans(spans),
            WindowsExpression::Contains(contains) => self.contains(contains),
            WindowsExpression::LongerThan { windows, duration } | WindowsExpression::ShorterThan { windows, duration } => {
                self.windows(windows);
                self.duration(duration);
            }
            WindowsExpression::ShiftEdges { windows, from_start, from_end } => {
                self.windows(windows);
                self.duration(from_start);
                self.duration(from_end);
            }
        }
    }

    fn spans(&mut self, expr: &SpansExpression) {
        match expr {
            SpansExpression::ActivitiesOfType { .. } | SpansExpression::Interval { .. } => {}
            SpansExpression::ActivitySpan { alias } => {
                self.enter("spans-of");
                self.reference(alias);
                self.leave();
            }
            SpansExpression::ForEachActivitySpans { alias, expression, .. } => {
                self.enter("for-each-activity");
                self.bound.push(alias.clone());
                self.spans(expression);
                self.bound.pop();
                self.leave();
            }
            SpansExpression::FromWindows(windows) => self.windows(windows),
            SpansExpression::SelectWhenTrue { spans, windows } => {
                self.spans(spans);
                self.windows(windows);
            }
            SpansExpression::Starts(spans) | SpansExpression::Ends(spans) => self.spans(spans),
        }
    }

    fn contains(&mut self, contains: &SpansContains) {
        self.enter("contains");
        self.spans(&contains.parents);
        self.spans(&contains.children);
        for duration in [&contains.requirement.min_duration, &contains.requirement.max_duration]
            .into_iter()
            .flatten()
        {
            self.duration(duration);
        }
        self.leave();
    }

    fn real(&mut self, expr: &RealExpression) {
        match expr {
            RealExpression::Resource(_) | RealExpression::Value(_) => {}
            RealExpression::Plus(left, right) | RealExpression::Minus(left, right) => {
                self.real(left);
                self.real(right);
            }
            RealExpression::Times(inner, _) | RealExpression::Rate(inner) => self.real(inner),
            RealExpression::AccumulatedDuration { windows, .. } => self.windows(windows),
        }
    }

    fn duration(&mut self, expr: &DurationExpression) {
        if let DurationExpression::ActivityDuration { alias } = expr {
            self.enter("duration-of");
            self.reference(alias);
            self.leave();
        }
    }
}
