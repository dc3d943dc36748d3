//! Span-valued expressions.
use super::{indent, EvaluationError, Expression, WindowsExpression};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::time::{Interval, Span, Spans};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum SpansExpression {
    /// Every simulated instance of the type, attributed to its id.
    ActivitiesOfType { activity_type: String },
    ActivitySpan { alias: String },
    ForEachActivitySpans { activity_type: String, alias: String, expression: Box<SpansExpression> },
    FromWindows(Box<WindowsExpression>),
    /// A named interval supplied through the environment.
    Interval { alias: String },
    SelectWhenTrue { spans: Box<SpansExpression>, windows: Box<WindowsExpression> },
    Starts(Box<SpansExpression>),
    Ends(Box<SpansExpression>),
}

impl Expression for SpansExpression {
    type Output = Spans;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<Spans, EvaluationError> {
        match self {
            SpansExpression::ActivitiesOfType { activity_type } => {
                Ok(Spans::of_activities(results, activity_type, bounds))
            }
            SpansExpression::ActivitySpan { alias } => {
                let instance = environment
                    .activity(alias)
                    .ok_or_else(|| EvaluationError::UnboundAlias { alias: alias.clone() })?;
                Ok(Spans::new(instance.interval.intersect(&bounds).map(|i| Span::of_activity(i, instance.id))))
            }
            SpansExpression::ForEachActivitySpans { activity_type, alias, expression } => {
                let per_instance = results
                    .activities_of_type(activity_type)
                    .map(|instance| expression.evaluate(results, bounds, &environment.bind_activity(alias, instance)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Spans::concat(per_instance))
            }
            SpansExpression::FromWindows(windows) => {
                Ok(Spans::from_windows(&windows.evaluate(results, bounds, environment)?))
            }
            SpansExpression::Interval { alias } => {
                let interval = environment
                    .interval(alias)
                    .ok_or_else(|| EvaluationError::NoSuchInterval { alias: alias.clone() })?;
                Ok(Spans::new(interval.intersect(&bounds).map(Span::new)))
            }
            SpansExpression::SelectWhenTrue { spans, windows } => {
                let spans = spans.evaluate(results, bounds, environment)?;
                let windows = windows.evaluate(results, bounds, environment)?;
                Ok(spans.select_when_true(&windows))
            }
            SpansExpression::Starts(spans) => Ok(spans.evaluate(results, bounds, environment)?.starts()),
            SpansExpression::Ends(spans) => Ok(spans.evaluate(results, bounds, environment)?.ends()),
        }
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        match self {
            SpansExpression::ActivitiesOfType { .. }
            | SpansExpression::ActivitySpan { .. }
            | SpansExpression::Interval { .. } => {}
            SpansExpression::ForEachActivitySpans { expression, .. } => expression.extract_resources(names),
            SpansExpression::FromWindows(windows) => windows.extract_resources(names),
            SpansExpression::SelectWhenTrue { spans, windows } => {
                spans.extract_resources(names);
                windows.extract_resources(names);
            }
            SpansExpression::Starts(spans) | SpansExpression::Ends(spans) => spans.extract_resources(names),
        }
    }

    fn pretty_print(&self, prefix: &str) -> String {
        let inner = indent(prefix);
        match self {
            SpansExpression::ActivitiesOfType { activity_type } => {
                format!("\n{}(spans-of-type {})", prefix, activity_type)
            }
            SpansExpression::ActivitySpan { alias } => format!("\n{}(spans-of {})", prefix, alias),
            SpansExpression::ForEachActivitySpans { activity_type, alias, expression } => format!(
                "\n{}(for-each-activity {} {}{})",
                prefix,
                activity_type,
                alias,
                expression.pretty_print(&inner)
            ),
            SpansExpression::FromWindows(windows) => format!("\n{}(spans-from{})", prefix, windows.pretty_print(&inner)),
            SpansExpression::Interval { alias } => format!("\n{}(interval {})", prefix, alias),
            SpansExpression::SelectWhenTrue { spans, windows } => format!(
                "\n{}(select-when-true{}{})",
                prefix,
                spans.pretty_print(&inner),
                windows.pretty_print(&inner)
            ),
            SpansExpression::Starts(spans) => format!("\n{}(starts{})", prefix, spans.pretty_print(&inner)),
            SpansExpression::Ends(spans) => format!("\n{}(ends{})", prefix, spans.pretty_print(&inner)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::interval::test_support::*;
    use crate::tree::test_support::{activity, banana_results};

    #[test]
    fn test_activities_of_type_are_attributed_and_cropped() {
        let results = banana_results()
            .with_activity(activity(1, "BiteBanana", closed(90, 120)))
            .with_activity(activity(2, "PeelBanana", closed(5, 6)))
            .with_activity(activity(3, "BiteBanana", closed(10, 12)));
        let env = EvaluationEnvironment::new();
        let spans = SpansExpression::ActivitiesOfType { activity_type: "BiteBanana".into() }
            .evaluate(&results, closed(0, 100), &env)
            .unwrap();
        let got: Vec<_> = spans.iter().map(|s| (s.interval, s.activity_id)).collect();
        assert_eq!(got, vec![(closed(10, 12), Some(3)), (closed(90, 100), Some(1))]);
    }

    #[test]
    fn test_for_each_activity_spans_binds_alias() {
        let results = banana_results()
            .with_activity(activity(1, "BiteBanana", closed(0, 5)))
            .with_activity(activity(2, "BiteBanana", closed(20, 25)));
        let env = EvaluationEnvironment::new();
        let expr = SpansExpression::ForEachActivitySpans {
            activity_type: "BiteBanana".into(),
            alias: "bite".into(),
            expression: Box::new(SpansExpression::Ends(Box::new(SpansExpression::ActivitySpan { alias: "bite".into() }))),
        };
        let spans = expr.evaluate(&results, closed(0, 100), &env).unwrap();
        assert_eq!(spans.intervals().collect::<Vec<_>>(), vec![closed(5, 5), closed(25, 25)]);
    }

    #[test]
    fn test_for_each_activity_spans_orders_output_across_instances() {
        let results = banana_results()
            .with_activity(activity(1, "BiteBanana", closed(60, 70)))
            .with_activity(activity(2, "BiteBanana", closed(10, 20)))
            .with_activity(activity(3, "BiteBanana", closed(30, 40)));
        let expr = SpansExpression::ForEachActivitySpans {
            activity_type: "BiteBanana".into(),
            alias: "bite".into(),
            expression: Box::new(SpansExpression::ActivitySpan { alias: "bite".into() }),
        };
        let spans = expr.evaluate(&results, closed(0, 100), &EvaluationEnvironment::new()).unwrap();
        let ids: Vec<_> = spans.iter().map(|s| s.activity_id).collect();
        assert_eq!(ids, vec![Some(2), Some(3), Some(1)]);
    }

    #[test]
    fn test_named_interval() {
        let results = banana_results();
        let env = EvaluationEnvironment::new().with_interval("window", closed(3, 7));
        let spans = SpansExpression::Interval { alias: "window".into() }
            .evaluate(&results, closed(0, 100), &env)
            .unwrap();
        assert_eq!(spans.intervals().collect::<Vec<_>>(), vec![closed(3, 7)]);

        let missing = SpansExpression::Interval { alias: "other".into() }.evaluate(&results, closed(0, 100), &env);
        assert_eq!(missing.unwrap_err(), EvaluationError::NoSuchInterval { alias: "other".into() });
    }
}
