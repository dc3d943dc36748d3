//! Real-valued profile expressions.
use super::{indent, EvaluationError, Expression, WindowsExpression};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::profile::{LinearProfile, Profile};
use crate::time::{Duration, Interval};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum RealExpression {
    Resource(String),
    Value(f64),
    Plus(Box<RealExpression>, Box<RealExpression>),
    Minus(Box<RealExpression>, Box<RealExpression>),
    Times(Box<RealExpression>, f64),
    Rate(Box<RealExpression>),
    AccumulatedDuration { windows: Box<WindowsExpression>, unit: Duration },
}

impl RealExpression {
    pub fn resource(name: impl Into<String>) -> Self {
        RealExpression::Resource(name.into())
    }
}

/// Looks a real resource up in the snapshot, then among external profiles, and crops it
/// to `bounds`. Numeric discrete resources are accepted as step-shaped real profiles.
fn resolve_resource(
    name: &str,
    results: &SimulationResults,
    bounds: Interval,
    environment: &EvaluationEnvironment<'_>,
) -> Result<LinearProfile, EvaluationError> {
    let not_numeric = || EvaluationError::NotNumeric { name: name.to_string() };

    let profile = if let Some(profile) = results.real_profiles.get(name) {
        profile.crop(bounds)
    } else if let Some(profile) = results.discrete_profiles.get(name) {
        profile.as_linear().ok_or_else(not_numeric)?.crop(bounds)
    } else if let Some(profile) = environment.real_external_profile(name) {
        profile.crop(bounds)
    } else if let Some(profile) = environment.discrete_external_profile(name) {
        profile.as_linear().ok_or_else(not_numeric)?.crop(bounds)
    } else {
        return Err(EvaluationError::NoSuchResource { name: name.to_string() });
    };
    profile.ok_or(EvaluationError::DisjointBounds { operation: "resource" })
}

impl Expression for RealExpression {
    type Output = LinearProfile;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<LinearProfile, EvaluationError> {
        match self {
            RealExpression::Resource(name) => resolve_resource(name, results, bounds, environment),
            RealExpression::Value(value) => Ok(Profile::constant_value(bounds, *value)),
            RealExpression::Plus(left, right) => {
                let left = left.evaluate(results, bounds, environment)?;
                let right = right.evaluate(results, bounds, environment)?;
                left.plus(&right).ok_or(EvaluationError::DisjointBounds { operation: "plus" })
            }
            RealExpression::Minus(left, right) => {
                let left = left.evaluate(results, bounds, environment)?;
                let right = right.evaluate(results, bounds, environment)?;
                left.minus(&right).ok_or(EvaluationError::DisjointBounds { operation: "minus" })
            }
            RealExpression::Times(profile, scalar) => {
                Ok(profile.evaluate(results, bounds, environment)?.times(*scalar))
            }
            RealExpression::Rate(profile) => Ok(profile.evaluate(results, bounds, environment)?.rate()),
            RealExpression::AccumulatedDuration { windows, unit } => {
                Ok(windows.evaluate(results, bounds, environment)?.accumulated_duration(*unit))
            }
        }
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        match self {
            RealExpression::Resource(name) => {
                names.insert(name.clone());
            }
            RealExpression::Value(_) => {}
            RealExpression::Plus(left, right) | RealExpression::Minus(left, right) => {
                left.extract_resources(names);
                right.extract_resources(names);
            }
            RealExpression::Times(profile, _) | RealExpression::Rate(profile) => profile.extract_resources(names),
            RealExpression::AccumulatedDuration { windows, .. } => windows.extract_resources(names),
        }
    }

    fn pretty_print(&self, prefix: &str) -> String {
        let inner = indent(prefix);
        match self {
            RealExpression::Resource(name) => format!("\n{}(resource {})", prefix, name),
            RealExpression::Value(value) => format!("\n{}(value {})", prefix, value),
            RealExpression::Plus(left, right) => format!(
                "\n{}(+{}{})",
                prefix,
                left.pretty_print(&inner),
                right.pretty_print(&inner)
            ),
            RealExpression::Minus(left, right) => format!(
                "\n{}(-{}{})",
                prefix,
                left.pretty_print(&inner),
                right.pretty_print(&inner)
            ),
            RealExpression::Times(profile, scalar) => {
                format!("\n{}(* {}{})", prefix, scalar, profile.pretty_print(&inner))
            }
            RealExpression::Rate(profile) => format!("\n{}(rate-of{})", prefix, profile.pretty_print(&inner)),
            RealExpression::AccumulatedDuration { windows, unit } => format!(
                "\n{}(accumulated-duration {}{})",
                prefix,
                unit,
                windows.pretty_print(&inner)
            ),
        }
    }
}
