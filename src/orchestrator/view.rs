//! A snapshot that fetches resource profiles from its handle only when asked.
use super::services::SimulationResultsHandle;
use crate::model::SimulationResults;
use std::collections::HashSet;
use tracing::debug;

pub struct SimulationView {
    handle: Box<dyn SimulationResultsHandle>,
    results: SimulationResults,
    /// Names already requested from the handle, found or not.
    requested: HashSet<String>,
    complete: bool,
}

impl SimulationView {
    /// Activities are read up front. Profiles start empty.
    pub fn new(handle: Box<dyn SimulationResultsHandle>) -> Self {
        let mut results = SimulationResults::new(handle.plan_start(), handle.bounds());
        results.activities = handle.activities();
        Self { handle, results, requested: HashSet::new(), complete: false }
    }

    pub fn simulation_dataset_id(&self) -> i64 {
        self.handle.simulation_dataset_id()
    }

    pub fn results(&self) -> &SimulationResults {
        &self.results
    }

    /// Ensures every named profile has been fetched once. Unknown names are remembered
    /// so they are not asked for again.
    pub fn load<'n>(&mut self, names: impl IntoIterator<Item = &'n String>) {
        if self.complete {
            return;
        }
        for name in names {
            if !self.requested.insert(name.clone()) {
                continue;
            }
            if let Some(profile) = self.handle.fetch_real_profile(name) {
                self.results.real_profiles.insert(name.clone(), profile);
            } else if let Some(profile) = self.handle.fetch_discrete_profile(name) {
                self.results.discrete_profiles.insert(name.clone(), profile);
            } else {
                debug!(resource = %name, "Simulation has no profile for resource");
            }
        }
    }

    /// Fetches every profile the simulation has.
    pub fn load_all(&mut self) {
        let names = self.handle.resource_names();
        self.load(names.iter());
        self.complete = true;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::CountingSimulation;
    use super::*;
    use crate::profile::{DiscreteProfile, SerializedValue};
    use crate::time::interval::test_support::*;
    use crate::tree::test_support::{activity, banana_results};
    use std::sync::atomic::Ordering;

    fn simulation() -> CountingSimulation {
        let results = banana_results()
            .with_activity(activity(1, "Bite", closed(10, 20)))
            .with_discrete_profile("/producer", DiscreteProfile::constant(closed(0, 100), SerializedValue::from("Chiquita")));
        CountingSimulation::new(4, results)
    }

    #[test]
    fn test_fetches_each_name_once() {
        let handle = simulation();
        let fetches = handle.fetches.clone();
        let mut view = SimulationView::new(Box::new(handle));
        assert_eq!(view.results().activities.len(), 1);
        assert!(view.results().real_profiles.is_empty());

        let names = vec!["/fruit".to_string(), "/producer".to_string()];
        view.load(names.iter());
        // One real fetch for /fruit, then real and discrete lookups for /producer.
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        view.load(names.iter());
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
        assert!(view.results().has_resource("/fruit"));
        assert!(view.results().has_resource("/producer"));
    }

    #[test]
    fn test_missing_names_are_not_retried() {
        let handle = simulation();
        let fetches = handle.fetches.clone();
        let mut view = SimulationView::new(Box::new(handle));
        let names = vec!["/peel".to_string()];
        view.load(names.iter());
        view.load(names.iter());
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert!(!view.results().has_resource("/peel"));
    }

    #[test]
    fn test_load_all_reads_everything() {
        let mut view = SimulationView::new(Box::new(simulation()));
        view.load_all();
        assert!(view.results().has_resource("/fruit"));
        assert!(view.results().has_resource("/producer"));
        assert_eq!(view.simulation_dataset_id(), 4);
    }
}
