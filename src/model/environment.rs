//! Evaluation context threaded through the expression tree.
use super::snapshot::ActivityInstance;
use crate::profile::{DiscreteProfile, LinearProfile};
use crate::time::Interval;
use std::collections::HashMap;
use std::sync::Arc;

/// Alias bindings and externally supplied profiles visible to an evaluation.
///
/// Iteration nodes derive child environments with [`EvaluationEnvironment::bind_activity`],
/// which copies the alias map and shares the profile maps.
#[derive(Debug, Clone, Default)]
pub struct EvaluationEnvironment<'a> {
    activity_instances: HashMap<String, &'a ActivityInstance>,
    intervals: HashMap<String, Interval>,
    real_external_profiles: Arc<HashMap<String, LinearProfile>>,
    discrete_external_profiles: Arc<HashMap<String, DiscreteProfile>>,
}

impl<'a> EvaluationEnvironment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_external_profiles(
        real: Arc<HashMap<String, LinearProfile>>,
        discrete: Arc<HashMap<String, DiscreteProfile>>,
    ) -> Self {
        Self {
            real_external_profiles: real,
            discrete_external_profiles: discrete,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, alias: impl Into<String>, interval: Interval) -> Self {
        self.intervals.insert(alias.into(), interval);
        self
    }

    /// A child environment with `alias` bound to `instance`, shadowing any outer binding.
    pub fn bind_activity(&self, alias: &str, instance: &'a ActivityInstance) -> Self {
        let mut child = self.clone();
        child.activity_instances.insert(alias.to_string(), instance);
        child
    }

    pub fn activity(&self, alias: &str) -> Option<&'a ActivityInstance> {
        self.activity_instances.get(alias).copied()
    }

    pub fn interval(&self, alias: &str) -> Option<Interval> {
        self.intervals.get(alias).copied()
    }

    pub fn real_external_profile(&self, name: &str) -> Option<&LinearProfile> {
        self.real_external_profiles.get(name)
    }

    pub fn discrete_external_profile(&self, name: &str) -> Option<&DiscreteProfile> {
        self.discrete_external_profiles.get(name)
    }
}
