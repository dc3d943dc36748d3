//! Root nodes: expressions that produce a [`ConstraintResult`].
use super::{indent, EvaluationError, Expression, WindowsExpression};
use crate::model::{ConstraintResult, EvaluationEnvironment, SimulationResults, Violation};
use crate::time::{Interval, Windows};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintExpression {
    /// Violated wherever the windows are false. Time outside the windows' universe is a gap.
    ViolationsOf(WindowsExpression),
    /// Evaluates `expression` once per activity of `activity_type` with `alias` bound to it,
    /// attributing each violation to that activity.
    ForEachActivityViolations { activity_type: String, alias: String, expression: Box<ConstraintExpression> },
}

impl Expression for ConstraintExpression {
    type Output = ConstraintResult;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<ConstraintResult, EvaluationError> {
        match self {
            ConstraintExpression::ViolationsOf(expression) => {
                let windows = expression.evaluate(results, bounds, environment)?;
                let violated: Vec<Interval> = windows.false_intervals().collect();
                let violations = if violated.is_empty() { vec![] } else { vec![Violation::new(violated, [])] };
                let gaps = Windows::new(bounds, true).set(&[windows.universe()], false).true_intervals().collect();
                Ok(ConstraintResult::new(violations, gaps))
            }
            ConstraintExpression::ForEachActivityViolations { activity_type, alias, expression } => {
                let mut total = ConstraintResult::default();
                for instance in results.activities_of_type(activity_type) {
                    let child = environment.bind_activity(alias, instance);
                    let mut result = expression.evaluate(results, bounds, &child)?;
                    for violation in &mut result.violations {
                        violation.add_activity_id(instance.id);
                    }
                    total = total.merge(result);
                }
                Ok(total)
            }
        }
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        match self {
            ConstraintExpression::ViolationsOf(expression) => expression.extract_resources(names),
            ConstraintExpression::ForEachActivityViolations { expression, .. } => expression.extract_resources(names),
        }
    }

    fn pretty_print(&self, prefix: &str) -> String {
        let inner = indent(prefix);
        match self {
            ConstraintExpression::ViolationsOf(expression) => {
                format!("\n{}(violations-of{})", prefix, expression.pretty_print(&inner))
            }
            ConstraintExpression::ForEachActivityViolations { activity_type, alias, expression } => format!(
                "\n{}(for-each-activity {} {}{})",
                prefix,
                activity_type,
                alias,
                expression.pretty_print(&inner)
            ),
        }
    }
}
