//! Batch checking of a plan's constraints: caching, compilation, isolation of failures,
//! cancellation, and persistence of the results.
pub mod action;
pub mod cancel;
pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod response;
pub mod results;
pub mod services;
pub mod view;

pub use action::ConstraintAction;
pub use cancel::CancellationToken;
pub use config::{ConstraintRequestConfiguration, OrchestratorConfig};
pub use error::{CodeLocation, CompileError, ConstraintActionError, ConstraintError, StoreError};
pub use memory::{InMemoryConstraintStore, StoredRequest};
pub use record::{CacheKey, ConstraintRecord, ConstraintType, ExternalDataset, Plan};
pub use response::serialize_constraint_results;
pub use results::{ConstraintOutcome, ConstraintResultMap, ConstraintRun, RunSource};
pub use services::{
    ActivityReference, ConstraintCompiler, ConstraintProcedure, ConstraintStore, InMemorySimulation, PlanService,
    ProceduralViolation, ProcedureLoader, SimulationResultsHandle, SimulationService,
};
pub use view::SimulationView;
