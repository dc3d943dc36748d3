use super::{EvaluationError, Expression};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::time::{Duration, Interval};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum DurationExpression {
    Value(Duration),
    /// Length of the activity bound to `alias`.
    ActivityDuration { alias: String },
}

impl Expression for DurationExpression {
    type Output = Duration;

    fn evaluate<'a>(
        &self,
        _results: &'a SimulationResults,
        _bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<Duration, EvaluationError> {
        match self {
            DurationExpression::Value(duration) => Ok(*duration),
            DurationExpression::ActivityDuration { alias } => environment
                .activity(alias)
                .map(|instance| instance.interval.duration())
                .ok_or_else(|| EvaluationError::UnboundAlias { alias: alias.clone() }),
        }
    }

    fn extract_resources(&self, _names: &mut BTreeSet<String>) {}

    fn pretty_print(&self, prefix: &str) -> String {
        match self {
            DurationExpression::Value(duration) => format!("\n{}(duration {})", prefix, duration),
            DurationExpression::ActivityDuration { alias } => format!("\n{}(duration-of {})", prefix, alias),
        }
    }
}
