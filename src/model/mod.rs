//! Evaluation inputs and outputs: the simulation snapshot, the environment, and results.
pub mod environment;
pub mod snapshot;
pub mod violation;

pub use environment::EvaluationEnvironment;
pub use snapshot::{ActivityInstance, SimulationResults};
pub use violation::{ActivityIds, ConstraintResult, Violation};
