//! Checks every constraint attached to a plan against one of its simulations.
//!
//! A request runs in four stages:
//! 1. Resolve the plan and the simulation dataset. Failures here abort the request.
//! 2. Seed outcomes from stored runs unless the caller forces re-evaluation.
//! 3. Compile or load the remaining constraints, then evaluate them in priority order
//!    against a lazily populated view of the simulation.
//! 4. Persist every outcome as one request and hand the ordered map back.
//!
//! From stage 2 on, a constraint that fails only records its own failure.
use super::cancel::{BatchGuard, CancellationToken};
use super::config::{ConstraintRequestConfiguration, OrchestratorConfig};
use super::error::{ConstraintActionError, ConstraintError};
use super::record::{ConstraintRecord, ConstraintType, Plan};
use super::results::{ConstraintResultMap, ConstraintRun, RunSource};
use super::services::{
    ActivityReference, ConstraintCompiler, ConstraintProcedure, ConstraintStore, PlanService, ProceduralViolation,
    ProcedureLoader, SimulationResultsHandle, SimulationService,
};
use super::view::SimulationView;
use crate::analysis::{referenced_resources, ScopeChecker};
use crate::model::{ConstraintResult, EvaluationEnvironment, SimulationResults, Violation};
use crate::profile::{DiscreteProfile, LinearProfile, Profile};
use crate::tree::{ConstraintExpression, EvaluationError, Expression};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

type RealProfiles = Arc<HashMap<String, LinearProfile>>;
type DiscreteProfiles = Arc<HashMap<String, DiscreteProfile>>;

pub struct ConstraintAction<'s> {
    plans: &'s dyn PlanService,
    simulations: &'s dyn SimulationService,
    compiler: &'s dyn ConstraintCompiler,
    procedures: &'s dyn ProcedureLoader,
    store: &'s dyn ConstraintStore,
    config: OrchestratorConfig,
}

enum Executable {
    Edsl { expression: ConstraintExpression, resources: BTreeSet<String> },
    Procedure(Box<dyn ConstraintProcedure>),
}

/// A constraint that compiled or loaded and is waiting to be evaluated.
struct Runnable {
    slot: usize,
    record: ConstraintRecord,
    executable: Executable,
}

/// Everything an evaluation reads. Shared read-only across workers.
struct Inputs<'i> {
    plan: &'i Plan,
    results: &'i SimulationResults,
    real: &'i RealProfiles,
    discrete: &'i DiscreteProfiles,
}

impl<'s> ConstraintAction<'s> {
    pub fn new(
        plans: &'s dyn PlanService,
        simulations: &'s dyn SimulationService,
        compiler: &'s dyn ConstraintCompiler,
        procedures: &'s dyn ProcedureLoader,
        store: &'s dyn ConstraintStore,
    ) -> Self {
        Self { plans, simulations, compiler, procedures, store, config: OrchestratorConfig::default() }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Checks the plan's constraints and returns the id of the persisted request with
    /// one run per constraint, ordered by priority.
    ///
    /// Without an explicit dataset, the latest simulation at the plan's current revision
    /// is used.
    pub fn get_violations(
        &self,
        plan_id: i64,
        simulation_dataset_id: Option<i64>,
        force: bool,
        requesting_user: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(i64, ConstraintResultMap), ConstraintActionError> {
        let plan = self.plans.plan(plan_id)?;
        let revision = self.plans.plan_revision(plan_id)?;
        let handle = self.resolve_dataset(plan_id, revision, simulation_dataset_id)?;
        let dataset_id = handle.simulation_dataset_id();
        let guard = BatchGuard::start(cancel, self.config.batch_timeout());

        let mut records = self.plans.constraints_for_plan(plan_id)?;
        records.sort_by_key(|record| record.priority);
        info!(plan_id, simulation_dataset_id = dataset_id, constraints = records.len(), force, "Checking constraints");

        let mut slots: Vec<Option<ConstraintRun>> = records.iter().map(|_| None).collect();
        if !force {
            self.seed_from_store(&records, dataset_id, &mut slots)?;
        }

        if slots.iter().any(Option::is_none) {
            let (real, discrete) = self.external_profiles(&plan, dataset_id)?;
            let runnable = self.prepare(&plan, dataset_id, &records, &mut slots);
            let outcomes = self.evaluate(&plan, handle, &runnable, &real, &discrete, &guard);
            for (slot, run) in outcomes {
                slots[slot] = Some(run);
            }
        }

        let map = ConstraintResultMap::new(finish(slots, &records));
        let configuration = ConstraintRequestConfiguration {
            plan_id,
            simulation_dataset_id: dataset_id,
            force,
            requesting_user: requesting_user.map(str::to_string),
        };
        let request_id = self.store.create_constraint_runs(&configuration, &map)?;

        let count = |source: RunSource| map.iter().filter(|run| run.source == source).count();
        info!(
            request_id,
            cached = count(RunSource::Cached),
            evaluated = count(RunSource::Evaluated),
            failed = count(RunSource::Failed),
            "Finished checking constraints"
        );
        Ok((request_id, map))
    }

    fn resolve_dataset(
        &self,
        plan_id: i64,
        revision: i64,
        simulation_dataset_id: Option<i64>,
    ) -> Result<Box<dyn SimulationResultsHandle>, ConstraintActionError> {
        match simulation_dataset_id {
            Some(id) => self.simulations.dataset(plan_id, id).ok_or_else(|| {
                ConstraintActionError::InputMismatch(format!("simulation dataset with id `{}` does not exist", id))
            }),
            None => self.simulations.latest_dataset(plan_id, revision).ok_or_else(|| {
                ConstraintActionError::InputMismatch(format!(
                    "plan with id {} has not yet been simulated at its current revision",
                    plan_id
                ))
            }),
        }
    }

    fn seed_from_store(
        &self,
        records: &[ConstraintRecord],
        dataset_id: i64,
        slots: &mut [Option<ConstraintRun>],
    ) -> Result<(), ConstraintActionError> {
        for run in self.store.valid_constraint_runs(records, dataset_id)? {
            let invocation_id = run.record.invocation_id;
            if let Err(errors) = &run.outcome {
                if !self.config.reuse_failed_runs || errors.iter().any(ConstraintError::is_transient) {
                    debug!(invocation_id, "Ignoring stored failure");
                    continue;
                }
            }
            let slot = records
                .iter()
                .zip(slots.iter())
                .position(|(record, slot)| record.invocation_id == invocation_id && slot.is_none());
            if let Some(slot) = slot {
                debug!(invocation_id, "Cache hit");
                slots[slot] = Some(run);
            }
        }
        Ok(())
    }

    /// External profiles keyed by name, shifted so that they line up with simulation time.
    /// Malformed profiles are skipped.
    fn external_profiles(
        &self,
        plan: &Plan,
        dataset_id: i64,
    ) -> Result<(RealProfiles, DiscreteProfiles), ConstraintActionError> {
        let mut real = HashMap::new();
        let mut discrete = HashMap::new();
        for dataset in self.plans.external_datasets(plan.id, dataset_id)? {
            let offset = dataset.offset - plan.simulation_offset;
            for (name, extents) in dataset.real_profiles {
                match Profile::from_extents(offset, extents) {
                    Ok(profile) => {
                        real.insert(name, profile);
                    }
                    Err(error) => warn!(resource = %name, %error, "Skipping malformed external profile"),
                }
            }
            for (name, extents) in dataset.discrete_profiles {
                match Profile::from_extents(offset, extents) {
                    Ok(profile) => {
                        discrete.insert(name, profile);
                    }
                    Err(error) => warn!(resource = %name, %error, "Skipping malformed external profile"),
                }
            }
        }
        Ok((Arc::new(real), Arc::new(discrete)))
    }

    /// Compiles or loads every constraint without an outcome. Those that fail get their
    /// failure recorded in place.
    fn prepare(
        &self,
        plan: &Plan,
        dataset_id: i64,
        records: &[ConstraintRecord],
        slots: &mut [Option<ConstraintRun>],
    ) -> Vec<Runnable> {
        let mut runnable = Vec::new();
        for (slot, record) in records.iter().enumerate() {
            if slots[slot].is_some() {
                continue;
            }
            let invocation_id = record.invocation_id;
            let executable = match &record.constraint_type {
                ConstraintType::Edsl { definition } => {
                    match self.compiler.compile(plan.mission_model_id, plan.id, dataset_id, definition) {
                        Err(errors) => {
                            warn!(invocation_id, errors = errors.len(), "Constraint failed to compile");
                            Err(errors
                                .into_iter()
                                .map(|error| ConstraintError::Compilation(error.for_constraint(&record.name)))
                                .collect())
                        }
                        Ok(expression) => match ScopeChecker::check(&expression) {
                            Err(errors) => {
                                warn!(invocation_id, errors = errors.len(), "Constraint references unbound aliases");
                                Err(errors.into_iter().map(ConstraintError::Scope).collect())
                            }
                            Ok(()) => Ok(Executable::Edsl { resources: referenced_resources(&expression), expression }),
                        },
                    }
                }
                ConstraintType::Procedure { path } => {
                    let path = self.config.procedure_root.join(path);
                    match self.procedures.load(&path) {
                        Ok(procedure) => Ok(Executable::Procedure(procedure)),
                        Err(message) => {
                            warn!(invocation_id, path = %path.display(), "Constraint procedure failed to load");
                            Err(vec![ConstraintError::ProcedureLoad { path: path.display().to_string(), message }])
                        }
                    }
                }
            };
            match executable {
                Ok(executable) => {
                    debug!(invocation_id, "Compiled");
                    runnable.push(Runnable { slot, record: record.clone(), executable });
                }
                Err(errors) => slots[slot] = Some(ConstraintRun::failed(record.clone(), errors)),
            }
        }
        runnable
    }

    fn evaluate(
        &self,
        plan: &Plan,
        handle: Box<dyn SimulationResultsHandle>,
        runnable: &[Runnable],
        real: &RealProfiles,
        discrete: &DiscreteProfiles,
        guard: &BatchGuard<'_>,
    ) -> Vec<(usize, ConstraintRun)> {
        let mut view = SimulationView::new(handle);
        if runnable.iter().any(|item| matches!(item.executable, Executable::Procedure(_))) {
            view.load_all();
        }

        if self.config.parallel {
            for item in runnable {
                if let Executable::Edsl { resources, .. } = &item.executable {
                    view.load(resources);
                }
            }
            let inputs = Inputs { plan, results: view.results(), real, discrete };
            return evaluate_parallel(runnable, &inputs, guard);
        }

        let mut outcomes = Vec::with_capacity(runnable.len());
        for item in runnable {
            if let Some(interruption) = guard.interruption() {
                outcomes.push((item.slot, item.interrupted(interruption)));
                continue;
            }
            if let Executable::Edsl { resources, .. } = &item.executable {
                view.load(resources);
            }
            let inputs = Inputs { plan, results: view.results(), real, discrete };
            outcomes.push((item.slot, item.run(&inputs)));
        }
        outcomes
    }
}

/// Each worker checks the guard before starting, so a cancellation stops the constraints
/// no worker has picked up yet.
fn evaluate_parallel(runnable: &[Runnable], inputs: &Inputs<'_>, guard: &BatchGuard<'_>) -> Vec<(usize, ConstraintRun)> {
    runnable
        .par_iter()
        .map(|item| match guard.interruption() {
            Some(interruption) => (item.slot, item.interrupted(interruption)),
            None => (item.slot, item.run(inputs)),
        })
        .collect()
}

impl Runnable {
    fn run(&self, inputs: &Inputs<'_>) -> ConstraintRun {
        let invocation_id = self.record.invocation_id;
        let results = inputs.results;
        let environment = EvaluationEnvironment::with_external_profiles(Arc::clone(inputs.real), Arc::clone(inputs.discrete));
        let outcome = match &self.executable {
            Executable::Edsl { expression, resources } => expression
                .evaluate(results, results.bounds, &environment)
                .map(|result| result.with_resource_ids(resources.clone())),
            Executable::Procedure(procedure) => procedure
                .run(inputs.plan, results, &self.record.arguments)
                .and_then(|violations| procedural_result(results, violations)),
        };
        match outcome {
            Ok(result) => {
                debug!(invocation_id, violations = result.violations.len(), "Evaluated");
                let result = result.with_metadata(self.record.constraint_id, self.record.revision, &self.record.name);
                ConstraintRun::evaluated(self.record.clone(), result)
            }
            Err(error) => {
                warn!(invocation_id, %error, "Constraint failed during evaluation");
                ConstraintRun::failed(self.record.clone(), vec![error.into()])
            }
        }
    }

    fn interrupted(&self, interruption: ConstraintError) -> ConstraintRun {
        warn!(invocation_id = self.record.invocation_id, reason = %interruption, "Constraint not evaluated");
        ConstraintRun::failed(self.record.clone(), vec![interruption])
    }
}

/// Converts a procedure's violations, replacing directive references with the ids of
/// the instances they spawned.
fn procedural_result(
    results: &SimulationResults,
    violations: Vec<ProceduralViolation>,
) -> Result<ConstraintResult, EvaluationError> {
    let by_directive = results.directive_index();
    let violations = violations
        .into_iter()
        .map(|violation| {
            let ids = violation
                .activities
                .iter()
                .map(|reference| match *reference {
                    ActivityReference::Instance(id) => Ok(id),
                    ActivityReference::Directive(directive_id) => by_directive
                        .get(&directive_id)
                        .map(|instance| instance.id)
                        .ok_or(EvaluationError::UnknownDirective { directive_id }),
                })
                .collect::<Result<Vec<i64>, EvaluationError>>()?;
            Ok(Violation::new(violation.windows, ids))
        })
        .collect::<Result<Vec<Violation>, EvaluationError>>()?;
    Ok(ConstraintResult::new(violations, vec![]))
}

/// Every slot left empty becomes an internal failure.
fn finish(slots: Vec<Option<ConstraintRun>>, records: &[ConstraintRecord]) -> Vec<ConstraintRun> {
    slots
        .into_iter()
        .zip(records)
        .map(|(slot, record)| {
            slot.unwrap_or_else(|| {
                warn!(invocation_id = record.invocation_id, "Constraint produced no outcome");
                ConstraintRun::failed(record.clone(), vec![ConstraintError::Internal])
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::error::{CodeLocation, CompileError};
    use crate::orchestrator::memory::InMemoryConstraintStore;
    use crate::orchestrator::record::ExternalDataset;
    use crate::orchestrator::services::InMemorySimulation;
    use crate::profile::{LinearDynamics, SerializedValue};
    use crate::time::interval::test_support::*;
    use crate::time::{Duration, Timestamp};
    use crate::tree::test_support::{activity, banana_results};
    use crate::tree::{Comparison, RealExpression, WindowsExpression};
    use rstest::rstest;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PLAN: i64 = 1;
    const DATASET: i64 = 40;

    struct FakePlans {
        revision: i64,
        simulation_offset: Duration,
        constraints: Vec<ConstraintRecord>,
        external: Vec<ExternalDataset>,
    }

    impl PlanService for FakePlans {
        fn plan(&self, plan_id: i64) -> Result<Plan, ConstraintActionError> {
            if plan_id != PLAN {
                return Err(ConstraintActionError::NoSuchPlan(plan_id));
            }
            Ok(Plan {
                id: PLAN,
                mission_model_id: 3,
                start: Timestamp::from_epoch_micros(0),
                duration: us(100),
                simulation_offset: self.simulation_offset,
            })
        }

        fn plan_revision(&self, _plan_id: i64) -> Result<i64, ConstraintActionError> {
            Ok(self.revision)
        }

        fn constraints_for_plan(&self, _plan_id: i64) -> Result<Vec<ConstraintRecord>, ConstraintActionError> {
            Ok(self.constraints.clone())
        }

        fn external_datasets(&self, _plan_id: i64, _dataset_id: i64) -> Result<Vec<ExternalDataset>, ConstraintActionError> {
            Ok(self.external.clone())
        }
    }

    /// One dataset, simulated at revision 0.
    struct FakeSimulations {
        results: SimulationResults,
    }

    impl FakeSimulations {
        fn handle(&self) -> Box<dyn SimulationResultsHandle> {
            Box::new(InMemorySimulation { simulation_dataset_id: DATASET, results: self.results.clone() })
        }
    }

    impl SimulationService for FakeSimulations {
        fn dataset(&self, plan_id: i64, dataset_id: i64) -> Option<Box<dyn SimulationResultsHandle>> {
            (plan_id == PLAN && dataset_id == DATASET).then(|| self.handle())
        }

        fn latest_dataset(&self, plan_id: i64, revision: i64) -> Option<Box<dyn SimulationResultsHandle>> {
            (plan_id == PLAN && revision == 0).then(|| self.handle())
        }
    }

    /// Compiles a fixed table of sources and counts how often it is asked.
    struct TableCompiler {
        table: HashMap<&'static str, ConstraintExpression>,
        calls: AtomicUsize,
    }

    impl ConstraintCompiler for TableCompiler {
        fn compile(&self, _: i64, _: i64, _: i64, definition: &str) -> Result<ConstraintExpression, Vec<CompileError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.table.get(definition).cloned().ok_or_else(|| {
                vec![CompileError::new(
                    format!("Cannot find name '{}'", definition),
                    "at constraint.ts:1:1",
                    CodeLocation { line: 1, column: 1 },
                )]
            })
        }
    }

    struct FnProcedure<F>(F);

    impl<F> ConstraintProcedure for FnProcedure<F>
    where
        F: Fn(&SimulationResults) -> Result<Vec<ProceduralViolation>, EvaluationError> + Send + Sync,
    {
        fn run(
            &self,
            _plan: &Plan,
            results: &SimulationResults,
            _arguments: &BTreeMap<String, SerializedValue>,
        ) -> Result<Vec<ProceduralViolation>, EvaluationError> {
            (self.0)(results)
        }
    }

    #[derive(Default)]
    struct FakeLoader {
        requested: Mutex<Vec<PathBuf>>,
    }

    impl ProcedureLoader for FakeLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn ConstraintProcedure>, String> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(path.to_path_buf());
            }
            match path.file_name().and_then(|name| name.to_str()) {
                Some("directive.jar") => Ok(Box::new(FnProcedure(|_: &SimulationResults| -> Result<Vec<ProceduralViolation>, EvaluationError> {
                    Ok(vec![ProceduralViolation {
                        windows: vec![closed(10, 20)],
                        activities: vec![ActivityReference::Directive(77), ActivityReference::Instance(3)],
                    }])
                }))),
                Some("orphan.jar") => Ok(Box::new(FnProcedure(|_: &SimulationResults| -> Result<Vec<ProceduralViolation>, EvaluationError> {
                    Ok(vec![ProceduralViolation { windows: vec![closed(0, 1)], activities: vec![ActivityReference::Directive(404)] }])
                }))),
                _ => Err("no such procedure".to_string()),
            }
        }
    }

    fn const_fruit() -> ConstraintExpression {
        ConstraintExpression::ViolationsOf(WindowsExpression::compare(
            Comparison::Equal,
            RealExpression::resource("/fruit"),
            RealExpression::Value(4.0),
        ))
    }

    fn bite_free() -> ConstraintExpression {
        ConstraintExpression::ForEachActivityViolations {
            activity_type: "BiteBanana".into(),
            alias: "bite".into(),
            expression: Box::new(ConstraintExpression::ViolationsOf(WindowsExpression::not(
                WindowsExpression::ActivityWindow { alias: "bite".into() },
            ))),
        }
    }

    fn compiler() -> TableCompiler {
        let mut table = HashMap::new();
        table.insert("const-fruit", const_fruit());
        table.insert("bite-free", bite_free());
        table.insert(
            "ghost",
            ConstraintExpression::ViolationsOf(WindowsExpression::ActivityWindow { alias: "ghost".into() }),
        );
        table.insert(
            "peel",
            ConstraintExpression::ViolationsOf(WindowsExpression::compare(
                Comparison::LessThan,
                RealExpression::resource("/peel"),
                RealExpression::Value(1.0),
            )),
        );
        table.insert(
            "cool",
            ConstraintExpression::ViolationsOf(WindowsExpression::compare(
                Comparison::LessThan,
                RealExpression::resource("/temperature"),
                RealExpression::Value(5.0),
            )),
        );
        TableCompiler { table, calls: AtomicUsize::new(0) }
    }

    fn plans(constraints: Vec<ConstraintRecord>) -> FakePlans {
        FakePlans { revision: 0, simulation_offset: Duration::ZERO, constraints, external: vec![] }
    }

    fn simulations() -> FakeSimulations {
        let mut directed = activity(5, "PeelBanana", closed(40, 45));
        directed.directive_id = Some(77);
        FakeSimulations {
            results: banana_results().with_activity(activity(1, "BiteBanana", closed(10, 20))).with_activity(directed),
        }
    }

    fn fruit_constraints() -> Vec<ConstraintRecord> {
        vec![
            ConstraintRecord::edsl(100, 10, "ConstFruit", "const-fruit").with_priority(1),
            ConstraintRecord::edsl(200, 20, "BiteFree", "bite-free").with_priority(0),
        ]
    }

    fn check(action: &ConstraintAction<'_>, force: bool) -> (i64, ConstraintResultMap) {
        action.get_violations(PLAN, None, force, Some("banana-ops"), &CancellationToken::new()).unwrap()
    }

    #[test]
    fn test_fruit_constraints_end_to_end() {
        let (plans, sims, compiler, loader, store) =
            (plans(fruit_constraints()), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let (request_id, map) = check(&action, false);

        assert_eq!(request_id, 1);
        let order: Vec<&str> = map.iter().map(|run| run.record.name.as_str()).collect();
        assert_eq!(order, vec!["BiteFree", "ConstFruit"]);

        let fruit = map.get(100).and_then(ConstraintRun::result).unwrap();
        assert_eq!(fruit.violations, vec![Violation::new(vec![closed(50, 100)], [])]);
        assert_eq!(fruit.constraint_name.as_deref(), Some("ConstFruit"));
        assert_eq!(fruit.constraint_id, Some(10));
        assert!(fruit.resource_ids.contains("/fruit"));

        let bites = map.get(200).and_then(ConstraintRun::result).unwrap();
        assert_eq!(bites.violations, vec![Violation::new(vec![closed(10, 20)], [1])]);

        let stored = store.requests().unwrap();
        assert_eq!(stored[0].configuration.simulation_dataset_id, DATASET);
        assert_eq!(stored[0].configuration.requesting_user.as_deref(), Some("banana-ops"));
    }

    #[test]
    fn test_second_request_reuses_stored_runs() {
        let (plans, sims, compiler, loader, store) =
            (plans(fruit_constraints()), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);

        let (_, first) = check(&action, false);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);

        let (second_id, second) = check(&action, false);
        assert_eq!(second_id, 2);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
        assert!(second.iter().all(|run| run.source == RunSource::Cached));
        let outcomes = |map: &ConstraintResultMap| map.iter().map(|run| run.outcome.clone()).collect::<Vec<_>>();
        assert_eq!(outcomes(&first), outcomes(&second));

        let (_, forced) = check(&action, true);
        assert_eq!(compiler.calls.load(Ordering::SeqCst), 4);
        assert!(forced.iter().all(|run| run.source == RunSource::Evaluated));
    }

    #[test]
    fn test_failing_constraints_are_isolated() {
        let constraints = vec![
            ConstraintRecord::edsl(1, 1, "ConstFruit", "const-fruit").with_priority(3),
            ConstraintRecord::edsl(2, 2, "Typo", "const-fruti").with_priority(0),
            ConstraintRecord::edsl(3, 3, "Ghost", "ghost").with_priority(1),
            ConstraintRecord::edsl(4, 4, "Peel", "peel").with_priority(2),
        ];
        let (plans, sims, compiler, loader, store) =
            (plans(constraints), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let (_, map) = check(&action, false);

        assert!(map.get(1).is_some_and(ConstraintRun::is_success));
        assert_eq!(map.failures().count(), 3);

        let typo = map.get(2).unwrap();
        assert_eq!(typo.source, RunSource::Failed);
        match &typo.errors()[0] {
            ConstraintError::Compilation(error) => {
                assert!(error.message.starts_with("Constraint 'Typo' compilation failed:\n "))
            }
            other => panic!("expected a compilation error, got {other:?}"),
        }
        assert!(matches!(map.get(3).unwrap().errors()[0], ConstraintError::Scope(_)));
        assert_eq!(
            map.get(4).unwrap().errors(),
            &[ConstraintError::Runtime(EvaluationError::NoSuchResource { name: "/peel".into() })]
        );
    }

    #[rstest]
    #[case(Some(99), 0, ConstraintActionError::InputMismatch("simulation dataset with id `99` does not exist".into()))]
    #[case(
        None,
        1,
        ConstraintActionError::InputMismatch("plan with id 1 has not yet been simulated at its current revision".into())
    )]
    fn test_unresolvable_dataset_aborts(
        #[case] dataset: Option<i64>,
        #[case] revision: i64,
        #[case] expected: ConstraintActionError,
    ) {
        let plans = FakePlans { revision, ..plans(fruit_constraints()) };
        let (sims, compiler, loader, store) = (simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let error = action.get_violations(PLAN, dataset, false, None, &CancellationToken::new()).unwrap_err();
        assert_eq!(error, expected);
        assert_eq!(store.requests().unwrap().len(), 0);
    }

    #[test]
    fn test_unknown_plan_aborts() {
        let (plans, sims, compiler, loader, store) =
            (plans(vec![]), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let error = action.get_violations(2, None, false, None, &CancellationToken::new()).unwrap_err();
        assert_eq!(error, ConstraintActionError::NoSuchPlan(2));
    }

    #[test]
    fn test_cancelled_request_records_pending_constraints() {
        let (plans, sims, compiler, loader, store) =
            (plans(fruit_constraints()), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let token = CancellationToken::new();
        token.cancel();

        let (_, map) = action.get_violations(PLAN, None, false, None, &token).unwrap();
        assert!(map.iter().all(|run| run.errors() == [ConstraintError::Cancelled]));
        assert_eq!(store.requests().unwrap().len(), 1);

        // Cancellation says nothing about the constraints, so it is not reused.
        let (_, retried) = check(&action, false);
        assert!(retried.iter().all(|run| run.source == RunSource::Evaluated));
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_exhausted_budget_times_out_every_constraint(#[case] parallel: bool) {
        let (plans, sims, compiler, loader, store) =
            (plans(fruit_constraints()), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let config = OrchestratorConfig { parallel, batch_timeout_ms: Some(0), ..OrchestratorConfig::default() };
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store).with_config(config);
        let (_, map) = check(&action, false);
        assert!(map.iter().all(|run| run.errors() == [ConstraintError::TimedOut { limit_ms: 0 }]));
    }

    #[rstest]
    #[case(true, RunSource::Cached, 1)]
    #[case(false, RunSource::Failed, 2)]
    fn test_stored_failures_follow_configuration(
        #[case] reuse_failed_runs: bool,
        #[case] second_source: RunSource,
        #[case] compilations: usize,
    ) {
        let constraints = vec![ConstraintRecord::edsl(2, 2, "Typo", "const-fruti")];
        let (plans, sims, compiler, loader, store) =
            (plans(constraints), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let config = OrchestratorConfig { reuse_failed_runs, ..OrchestratorConfig::default() };
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store).with_config(config);
        check(&action, false);
        let (_, second) = check(&action, false);
        assert_eq!(second.get(2).map(|run| run.source), Some(second_source));
        assert!(!second.get(2).unwrap().is_success());
        assert_eq!(compiler.calls.load(Ordering::SeqCst), compilations);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut constraints = fruit_constraints();
        constraints.push(ConstraintRecord::edsl(4, 4, "Peel", "peel").with_priority(1));
        let (plans, sims, compiler, loader) = (plans(constraints), simulations(), compiler(), FakeLoader::default());

        let sequential_store = InMemoryConstraintStore::new();
        let sequential = ConstraintAction::new(&plans, &sims, &compiler, &loader, &sequential_store);
        let parallel_store = InMemoryConstraintStore::new();
        let parallel = ConstraintAction::new(&plans, &sims, &compiler, &loader, &parallel_store)
            .with_config(OrchestratorConfig { parallel: true, ..OrchestratorConfig::default() });

        assert_eq!(check(&sequential, false).1, check(&parallel, false).1);
    }

    #[test]
    fn test_procedures_resolve_directives_to_instances() {
        let constraints = vec![
            ConstraintRecord::procedure(1, 1, "Directed", "directive.jar"),
            ConstraintRecord::procedure(2, 2, "Orphan", "orphan.jar"),
            ConstraintRecord::procedure(3, 3, "Missing", "missing.jar"),
        ];
        let (plans, sims, compiler, loader, store) =
            (plans(constraints), simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let config = OrchestratorConfig { procedure_root: PathBuf::from("/procedures"), ..OrchestratorConfig::default() };
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store).with_config(config);
        let (_, map) = check(&action, false);

        let directed = map.get(1).and_then(ConstraintRun::result).unwrap();
        assert_eq!(directed.violations[0].activity_instance_ids.as_slice(), &[5, 3]);
        assert_eq!(
            map.get(2).unwrap().errors(),
            &[ConstraintError::Runtime(EvaluationError::UnknownDirective { directive_id: 404 })]
        );
        assert!(matches!(
            &map.get(3).unwrap().errors()[0],
            ConstraintError::ProcedureLoad { path, .. } if path == "/procedures/missing.jar"
        ));
        assert!(loader.requested.lock().unwrap().contains(&PathBuf::from("/procedures/directive.jar")));
    }

    #[test]
    fn test_external_profiles_are_shifted_into_simulation_time() {
        let mut external = ExternalDataset { offset: us(30), ..ExternalDataset::default() };
        external.real_profiles.insert("/temperature".into(), vec![(us(10), LinearDynamics::constant(9.0))]);
        let plans = FakePlans {
            simulation_offset: us(10),
            external: vec![external],
            ..plans(vec![ConstraintRecord::edsl(1, 1, "Cool", "cool")])
        };
        let (sims, compiler, loader, store) = (simulations(), compiler(), FakeLoader::default(), InMemoryConstraintStore::new());
        let action = ConstraintAction::new(&plans, &sims, &compiler, &loader, &store);
        let (_, map) = check(&action, false);

        let cool = map.get(1).and_then(ConstraintRun::result).unwrap();
        assert_eq!(cool.violations, vec![Violation::new(vec![closed(20, 30)], [])]);
        assert_eq!(cool.gaps, vec![closed_open(0, 20), open_closed(30, 100)]);
    }

    #[test]
    fn test_unfilled_slots_become_internal_failures() {
        let records = fruit_constraints();
        let done = ConstraintRun::evaluated(records[1].clone(), ConstraintResult::default());
        let runs = finish(vec![None, Some(done)], &records);
        assert_eq!(runs[0].errors(), &[ConstraintError::Internal]);
        assert_eq!(runs[0].errors()[0].to_string(), "Internal error processing a constraint");
        assert!(runs[1].is_success());
    }
}
