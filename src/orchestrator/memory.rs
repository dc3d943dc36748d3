//! A [`ConstraintStore`] kept in process memory.
use super::config::ConstraintRequestConfiguration;
use super::error::StoreError;
use super::record::{CacheKey, ConstraintRecord};
use super::results::{ConstraintOutcome, ConstraintResultMap, ConstraintRun};
use super::services::ConstraintStore;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRequest {
    pub request_id: i64,
    pub configuration: ConstraintRequestConfiguration,
    pub invocation_ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct State {
    runs: HashMap<CacheKey, ConstraintOutcome>,
    requests: Vec<StoredRequest>,
}

#[derive(Debug, Default)]
pub struct InMemoryConstraintStore {
    state: Mutex<State>,
}

impl InMemoryConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError("constraint store lock poisoned".into()))
    }

    pub fn requests(&self) -> Result<Vec<StoredRequest>, StoreError> {
        Ok(self.lock()?.requests.clone())
    }

    pub fn run_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.runs.len())
    }
}

impl ConstraintStore for InMemoryConstraintStore {
    fn valid_constraint_runs(
        &self,
        records: &[ConstraintRecord],
        simulation_dataset_id: i64,
    ) -> Result<Vec<ConstraintRun>, StoreError> {
        let state = self.lock()?;
        Ok(records
            .iter()
            .filter_map(|record| {
                let outcome = state.runs.get(&record.cache_key(simulation_dataset_id))?;
                Some(ConstraintRun::cached(record.clone(), outcome.clone()))
            })
            .collect())
    }

    fn create_constraint_runs(
        &self,
        configuration: &ConstraintRequestConfiguration,
        runs: &ConstraintResultMap,
    ) -> Result<i64, StoreError> {
        let mut state = self.lock()?;
        for run in runs.iter() {
            state.runs.insert(run.record.cache_key(configuration.simulation_dataset_id), run.outcome.clone());
        }
        let request_id = state.requests.len() as i64 + 1;
        state.requests.push(StoredRequest {
            request_id,
            configuration: configuration.clone(),
            invocation_ids: runs.iter().map(|run| run.record.invocation_id).collect(),
        });
        Ok(request_id)
    }
}
