//! The constraint expression tree.
//!
//! Every node kind is a variant of a closed enum, one enum per result type. Nodes are
//! immutable once built and are evaluated against a simulation snapshot, the evaluation
//! bounds, and an [`EvaluationEnvironment`].
pub mod constraint;
pub mod contains;
pub mod discrete;
pub mod duration;
pub mod error;
pub mod real;
pub mod spans;
pub mod windows;

pub use constraint::ConstraintExpression;
pub use contains::{ContainsRequirement, SpansContains};
pub use discrete::DiscreteExpression;
pub use duration::DurationExpression;
pub use error::EvaluationError;
pub use real::RealExpression;
pub use spans::SpansExpression;
pub use windows::{Comparison, WindowsExpression};

use crate::model::{EvaluationEnvironment, SimulationResults};
use crate::time::Interval;
use std::collections::BTreeSet;

pub trait Expression {
    type Output;

    fn evaluate<'a>(
        &self,
        results: &'a SimulationResults,
        bounds: Interval,
        environment: &EvaluationEnvironment<'a>,
    ) -> Result<Self::Output, EvaluationError>;

    /// Adds every resource name this subtree reads to `names`.
    fn extract_resources(&self, names: &mut BTreeSet<String>);

    /// Renders the subtree as an indented s-expression. Each node starts on a new line.
    fn pretty_print(&self, prefix: &str) -> String;
}

/// Indentation for the children of a node printed at `prefix`.
pub(crate) fn indent(prefix: &str) -> String {
    format!("{}  ", prefix)
}
