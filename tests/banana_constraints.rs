use mission_constraints_core::display::format_report;
use mission_constraints_core::orchestrator::{
    serialize_constraint_results, CodeLocation, CompileError, ConstraintCompiler, ConstraintProcedure, ConstraintRecord,
    ExternalDataset, InMemoryConstraintStore, InMemorySimulation, Plan, PlanService, ProcedureLoader, RunSource,
    SimulationResultsHandle, SimulationService,
};
use mission_constraints_core::profile::{LinearDynamics, Profile, SerializedValue};
use mission_constraints_core::time::{Inclusivity, Timestamp};
use mission_constraints_core::tree::{Comparison, ContainsRequirement, RealExpression, SpansContains, SpansExpression, WindowsExpression};
use mission_constraints_core::{
    ActivityInstance, CancellationToken, ConstraintAction, ConstraintActionError, ConstraintExpression, Duration, Interval,
    OrchestratorConfig, SimulationResults,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

fn us(t: i64) -> Duration {
    Duration::from_micros(t)
}

fn closed(s: i64, e: i64) -> Interval {
    Interval::closed(us(s), us(e))
}

fn bite(id: i64, s: i64, e: i64) -> ActivityInstance {
    ActivityInstance {
        id,
        activity_type: "BiteBanana".into(),
        arguments: BTreeMap::new(),
        interval: closed(s, e),
        directive_id: Some(id + 1000),
        computed_attributes: SerializedValue::Null,
    }
}

struct Plans(Vec<ConstraintRecord>);

impl PlanService for Plans {
    fn plan(&self, plan_id: i64) -> Result<Plan, ConstraintActionError> {
        Ok(Plan {
            id: plan_id,
            mission_model_id: 1,
            start: Timestamp::from_epoch_micros(0),
            duration: us(100),
            simulation_offset: Duration::ZERO,
        })
    }

    fn plan_revision(&self, _: i64) -> Result<i64, ConstraintActionError> {
        Ok(0)
    }

    fn constraints_for_plan(&self, _: i64) -> Result<Vec<ConstraintRecord>, ConstraintActionError> {
        Ok(self.0.clone())
    }

    fn external_datasets(&self, _: i64, _: i64) -> Result<Vec<ExternalDataset>, ConstraintActionError> {
        Ok(vec![])
    }
}

struct Simulations(SimulationResults);

impl SimulationService for Simulations {
    fn dataset(&self, _: i64, dataset_id: i64) -> Option<Box<dyn SimulationResultsHandle>> {
        (dataset_id == 8).then(|| self.latest())
    }

    fn latest_dataset(&self, _: i64, _: i64) -> Option<Box<dyn SimulationResultsHandle>> {
        Some(self.latest())
    }
}

impl Simulations {
    fn latest(&self) -> Box<dyn SimulationResultsHandle> {
        Box::new(InMemorySimulation { simulation_dataset_id: 8, results: self.0.clone() })
    }
}

struct Compiler(HashMap<&'static str, ConstraintExpression>);

impl ConstraintCompiler for Compiler {
    fn compile(&self, _: i64, _: i64, _: i64, source: &str) -> Result<ConstraintExpression, Vec<CompileError>> {
        self.0
            .get(source)
            .cloned()
            .ok_or_else(|| vec![CompileError::new("unknown source", "", CodeLocation { line: 1, column: 1 })])
    }
}

struct NoProcedures;

impl ProcedureLoader for NoProcedures {
    fn load(&self, _: &Path) -> Result<Box<dyn ConstraintProcedure>, String> {
        Err("procedures are not installed".into())
    }
}

fn banana_simulation() -> SimulationResults {
    let fruit = Profile::from_extents(
        us(0),
        vec![(us(50), LinearDynamics::new(4.0, 0.0)), (us(50), LinearDynamics::new(4.0, -1.0))],
    )
    .unwrap();
    let mut results = SimulationResults::new(Timestamp::from_epoch_micros(0), closed(0, 100))
        .with_real_profile("/fruit", fruit)
        .with_activity(bite(1, 10, 20))
        .with_activity(bite(2, 60, 70));
    results.activities.push(ActivityInstance { activity_type: "Nap".into(), ..bite(3, 0, 30) });
    results
}

fn compiler() -> Compiler {
    let mut table = HashMap::new();
    table.insert(
        "const-fruit",
        ConstraintExpression::ViolationsOf(WindowsExpression::compare(
            Comparison::Equal,
            RealExpression::resource("/fruit"),
            RealExpression::Value(4.0),
        )),
    );
    // Every nap needs a bite inside it.
    table.insert(
        "nap-snack",
        ConstraintExpression::ViolationsOf(WindowsExpression::Contains(Box::new(SpansContains {
            parents: SpansExpression::ActivitiesOfType { activity_type: "Nap".into() },
            children: SpansExpression::ActivitiesOfType { activity_type: "BiteBanana".into() },
            requirement: ContainsRequirement::at_least(2),
        }))),
    );
    Compiler(table)
}

#[test]
fn test_banana_plan_end_to_end() {
    let plans = Plans(vec![
        ConstraintRecord::edsl(1, 11, "ConstFruit", "const-fruit"),
        ConstraintRecord::edsl(2, 12, "NapSnack", "nap-snack").with_priority(1),
        ConstraintRecord::procedure(3, 13, "PeelCount", "peel.jar").with_priority(2),
    ]);
    let sims = Simulations(banana_simulation());
    let (compiler, store) = (compiler(), InMemoryConstraintStore::new());
    let action = ConstraintAction::new(&plans, &sims, &compiler, &NoProcedures, &store);

    let (request_id, runs) = action.get_violations(1, Some(8), false, None, &CancellationToken::new()).unwrap();
    assert_eq!(runs.len(), 3);

    let fruit = runs.get(1).and_then(|run| run.result()).unwrap();
    assert_eq!(fruit.violations[0].windows, vec![closed(50, 100)]);

    // Only one bite falls inside the nap.
    let nap = runs.get(2).and_then(|run| run.result()).unwrap();
    assert_eq!(nap.violations[0].windows, vec![closed(0, 30)]);

    assert_eq!(runs.get(3).map(|run| run.source), Some(RunSource::Failed));

    let document = serialize_constraint_results(request_id, &runs);
    assert_eq!(document["constraintsRun"][0]["constraintName"], "ConstFruit");
    assert_eq!(document["constraintsRun"][2]["results"], json!({}));
    assert_eq!(
        document["constraintsRun"][0]["results"]["violations"][0]["windows"][0],
        json!({ "start": 50, "end": 100, "startInclusivity": "Inclusive", "endInclusivity": "Inclusive" })
    );

    let report = format_report(request_id, &runs);
    assert!(report.contains("[P0] ConstFruit (#1) VIOLATED [evaluated]"));
    assert!(report.contains("Error: Failed to load constraint procedure"));
}

#[test]
fn test_repeat_request_is_served_from_the_store() {
    let plans = Plans(vec![ConstraintRecord::edsl(1, 11, "ConstFruit", "const-fruit")]);
    let sims = Simulations(banana_simulation());
    let (compiler, store) = (compiler(), InMemoryConstraintStore::new());
    let action = ConstraintAction::new(&plans, &sims, &compiler, &NoProcedures, &store)
        .with_config(OrchestratorConfig::from_json(r#"{"parallel": true}"#).unwrap());

    let (_, first) = action.get_violations(1, None, false, None, &CancellationToken::new()).unwrap();
    let (_, second) = action.get_violations(1, None, false, None, &CancellationToken::new()).unwrap();
    assert_eq!(second.get(1).map(|run| run.source), Some(RunSource::Cached));
    assert_eq!(first.get(1).map(|run| &run.outcome), second.get(1).map(|run| &run.outcome));
    assert_eq!(store.requests().unwrap().len(), 2);
}

#[test]
fn test_interval_documents_round_trip_through_serde() {
    let interval: Interval = serde_json::from_value(json!({
        "start": 0, "end": 10, "startInclusivity": "Inclusive", "endInclusivity": "Exclusive"
    }))
    .unwrap();
    assert_eq!(interval.end_inclusivity(), Inclusivity::Exclusive);
    assert!(serde_json::from_value::<Interval>(json!({
        "start": 5, "end": 5, "startInclusivity": "Exclusive", "endInclusivity": "Inclusive"
    }))
    .is_err());
}
