//! The read-only simulation snapshot that constraints are evaluated against.
use crate::profile::{DiscreteProfile, LinearProfile, SerializedValue};
use crate::time::{Interval, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One simulated activity occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityInstance {
    pub id: i64,
    #[serde(rename = "type")]
    pub activity_type: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, SerializedValue>,
    pub interval: Interval,
    /// The plan directive this instance was spawned from, if any.
    #[serde(default)]
    pub directive_id: Option<i64>,
    /// Values the mission model derived once the activity finished.
    #[serde(default)]
    pub computed_attributes: SerializedValue,
}

#[derive(Debug, Clone)]
pub struct SimulationResults {
    pub plan_start: Timestamp,
    pub bounds: Interval,
    pub activities: Vec<ActivityInstance>,
    pub real_profiles: HashMap<String, LinearProfile>,
    pub discrete_profiles: HashMap<String, DiscreteProfile>,
}

impl SimulationResults {
    pub fn new(plan_start: Timestamp, bounds: Interval) -> Self {
        Self {
            plan_start,
            bounds,
            activities: Vec::new(),
            real_profiles: HashMap::new(),
            discrete_profiles: HashMap::new(),
        }
    }

    pub fn with_activity(mut self, activity: ActivityInstance) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn with_real_profile(mut self, name: impl Into<String>, profile: LinearProfile) -> Self {
        self.real_profiles.insert(name.into(), profile);
        self
    }

    pub fn with_discrete_profile(mut self, name: impl Into<String>, profile: DiscreteProfile) -> Self {
        self.discrete_profiles.insert(name.into(), profile);
        self
    }

    pub fn activities_of_type<'s>(&'s self, activity_type: &'s str) -> impl Iterator<Item = &'s ActivityInstance> + 's {
        self.activities.iter().filter(move |a| a.activity_type == activity_type)
    }

    /// Instances keyed by the directive that spawned them. When a directive spawned
    /// several, the first in simulation order wins.
    pub fn directive_index(&self) -> HashMap<i64, &ActivityInstance> {
        let mut index = HashMap::with_capacity(self.activities.len());
        for instance in &self.activities {
            if let Some(directive_id) = instance.directive_id {
                index.entry(directive_id).or_insert(instance);
            }
        }
        index
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.real_profiles.contains_key(name) || self.discrete_profiles.contains_key(name)
    }
}
