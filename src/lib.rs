//! Mission constraint checking over simulation results.
//!
//! Time is modelled as integer microsecond offsets ([`time`]). Resource histories are
//! [`profile`]s, constraints are expression [`tree`]s evaluated against a simulation
//! [`model`], and the [`orchestrator`] checks every constraint of a plan at once.

pub mod analysis;
pub mod display;
pub mod model;
pub mod orchestrator;
pub mod profile;
pub mod time;
pub mod tree;

pub use model::{ActivityInstance, ConstraintResult, EvaluationEnvironment, SimulationResults, Violation};
pub use orchestrator::{CancellationToken, ConstraintAction, ConstraintActionError, ConstraintResultMap, OrchestratorConfig};
pub use time::{Duration, Interval, Spans, Windows};
pub use tree::{ConstraintExpression, EvaluationError, Expression};
