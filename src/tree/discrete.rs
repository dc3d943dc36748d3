use super::{EvaluationError, Expression};
use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::profile::{DiscreteProfile, Profile, SerializedValue};
use crate::time::Interval;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum DiscreteExpression {
    Resource(String),
    Value(SerializedValue),
}

impl Expression for DiscreteExpression {
    type Output = DiscreteProfile;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<DiscreteProfile, EvaluationError> {
        match self {
            DiscreteExpression::Resource(name) => results
                .discrete_profiles
                .get(name)
                .or_else(|| environment.discrete_external_profile(name))
                .ok_or_else(|| EvaluationError::NoSuchResource { name: name.clone() })?
                .crop(bounds)
                .ok_or(EvaluationError::DisjointBounds { operation: "resource" }),
            DiscreteExpression::Value(value) => Ok(Profile::constant(bounds, value.clone())),
        }
    }

    fn extract_resources(&self, names: &mut BTreeSet<String>) {
        if let DiscreteExpression::Resource(name) = self {
            names.insert(name.clone());
        }
    }

    fn pretty_print(&self, prefix: &str) -> String {
        match self {
            DiscreteExpression::Resource(name) => format!("\n{}(resource {})", prefix, name),
            DiscreteExpression::Value(value) => format!("\n{}(value {})", prefix, value),
        }
    }
}
