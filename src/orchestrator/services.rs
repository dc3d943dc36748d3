//! Interfaces to the systems the orchestrator depends on but does not own.
use super::config::ConstraintRequestConfiguration;
use super::error::{CompileError, ConstraintActionError, StoreError};
use super::record::{ConstraintRecord, ExternalDataset, Plan};
use super::results::{ConstraintResultMap, ConstraintRun};
use crate::model::{ActivityInstance, SimulationResults};
use crate::profile::{DiscreteProfile, LinearProfile, SerializedValue};
use crate::time::{Interval, Timestamp};
use crate::tree::{ConstraintExpression, EvaluationError};
use std::collections::BTreeMap;
use std::path::Path;

pub trait PlanService {
    fn plan(&self, plan_id: i64) -> Result<Plan, ConstraintActionError>;

    fn plan_revision(&self, plan_id: i64) -> Result<i64, ConstraintActionError>;

    /// The plan's enabled constraint invocations, in any order.
    fn constraints_for_plan(&self, plan_id: i64) -> Result<Vec<ConstraintRecord>, ConstraintActionError>;

    fn external_datasets(
        &self,
        plan_id: i64,
        simulation_dataset_id: i64,
    ) -> Result<Vec<ExternalDataset>, ConstraintActionError>;
}

pub trait SimulationService {
    /// The dataset with this id, if it exists and belongs to the plan.
    fn dataset(&self, plan_id: i64, simulation_dataset_id: i64) -> Option<Box<dyn SimulationResultsHandle>>;

    /// The newest dataset simulated at the given plan revision.
    fn latest_dataset(&self, plan_id: i64, plan_revision: i64) -> Option<Box<dyn SimulationResultsHandle>>;
}

/// Access to one stored simulation. Profiles are fetched by name on demand.
pub trait SimulationResultsHandle {
    fn simulation_dataset_id(&self) -> i64;
    fn plan_start(&self) -> Timestamp;
    fn bounds(&self) -> Interval;
    fn activities(&self) -> Vec<ActivityInstance>;
    fn resource_names(&self) -> Vec<String>;
    fn fetch_real_profile(&self, name: &str) -> Option<LinearProfile>;
    fn fetch_discrete_profile(&self, name: &str) -> Option<DiscreteProfile>;
}

/// A snapshot already held in memory serves as its own handle.
pub struct InMemorySimulation {
    pub simulation_dataset_id: i64,
    pub results: SimulationResults,
}

impl SimulationResultsHandle for InMemorySimulation {
    fn simulation_dataset_id(&self) -> i64 {
        self.simulation_dataset_id
    }

    fn plan_start(&self) -> Timestamp {
        self.results.plan_start
    }

    fn bounds(&self) -> Interval {
        self.results.bounds
    }

    fn activities(&self) -> Vec<ActivityInstance> {
        self.results.activities.clone()
    }

    fn resource_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .results
            .real_profiles
            .keys()
            .chain(self.results.discrete_profiles.keys())
            .cloned()
            .collect();
        names.sort();
        names
    }

    fn fetch_real_profile(&self, name: &str) -> Option<LinearProfile> {
        self.results.real_profiles.get(name).cloned()
    }

    fn fetch_discrete_profile(&self, name: &str) -> Option<DiscreteProfile> {
        self.results.discrete_profiles.get(name).cloned()
    }
}

pub trait ConstraintCompiler {
    fn compile(
        &self,
        mission_model_id: i64,
        plan_id: i64,
        simulation_dataset_id: i64,
        definition: &str,
    ) -> Result<ConstraintExpression, Vec<CompileError>>;
}

/// Whom a procedural violation blames: a simulated instance, or the plan directive
/// that spawned one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityReference {
    Instance(i64),
    Directive(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProceduralViolation {
    pub windows: Vec<Interval>,
    pub activities: Vec<ActivityReference>,
}

/// A constraint written as code rather than as an expression tree.
pub trait ConstraintProcedure: Send + Sync {
    fn run(
        &self,
        plan: &Plan,
        results: &SimulationResults,
        arguments: &BTreeMap<String, SerializedValue>,
    ) -> Result<Vec<ProceduralViolation>, EvaluationError>;
}

pub trait ProcedureLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn ConstraintProcedure>, String>;
}

pub trait ConstraintStore {
    /// Stored runs matching the records' cache keys for this dataset.
    fn valid_constraint_runs(
        &self,
        records: &[ConstraintRecord],
        simulation_dataset_id: i64,
    ) -> Result<Vec<ConstraintRun>, StoreError>;

    /// Persists a finished request and returns its id.
    fn create_constraint_runs(
        &self,
        configuration: &ConstraintRequestConfiguration,
        runs: &ConstraintResultMap,
    ) -> Result<i64, StoreError>;
}
