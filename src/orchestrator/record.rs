//! Plan-side records the orchestrator reads: plans, constraint definitions and
//! externally supplied profile datasets.
use crate::profile::{LinearDynamics, SerializedValue};
use crate::time::{Duration, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: i64,
    pub mission_model_id: i64,
    pub start: Timestamp,
    pub duration: Duration,
    /// Offset of the simulated window from the plan start.
    #[serde(default)]
    pub simulation_offset: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConstraintType {
    /// Source compiled into a [`ConstraintExpression`](crate::tree::ConstraintExpression).
    Edsl { definition: String },
    /// A procedure, located relative to the configured procedure root.
    Procedure { path: PathBuf },
}

/// One enabled constraint invocation attached to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRecord {
    pub priority: i64,
    pub invocation_id: i64,
    pub constraint_id: i64,
    pub revision: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub constraint_type: ConstraintType,
    #[serde(default)]
    pub arguments: BTreeMap<String, SerializedValue>,
}

impl ConstraintRecord {
    pub fn edsl(invocation_id: i64, constraint_id: i64, name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            priority: 0,
            invocation_id,
            constraint_id,
            revision: 0,
            name: name.into(),
            description: String::new(),
            constraint_type: ConstraintType::Edsl { definition: definition.into() },
            arguments: BTreeMap::new(),
        }
    }

    pub fn procedure(invocation_id: i64, constraint_id: i64, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            constraint_type: ConstraintType::Procedure { path: path.into() },
            ..Self::edsl(invocation_id, constraint_id, name, "")
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<SerializedValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn cache_key(&self, simulation_dataset_id: i64) -> CacheKey {
        CacheKey {
            invocation_id: self.invocation_id,
            constraint_id: self.constraint_id,
            revision: self.revision,
            simulation_dataset_id,
            // Map keys are ordered, so equal arguments always serialize identically.
            arguments: serde_json::to_string(&self.arguments).unwrap_or_default(),
        }
    }
}

/// Identifies a stored run that can stand in for a fresh evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub invocation_id: i64,
    pub constraint_id: i64,
    pub revision: i64,
    pub simulation_dataset_id: i64,
    pub arguments: String,
}

/// Profiles uploaded next to a simulation, as segment extents from `offset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDataset {
    /// Start of the first segment, measured from the plan start.
    pub offset: Duration,
    pub real_profiles: BTreeMap<String, Vec<(Duration, LinearDynamics)>>,
    pub discrete_profiles: BTreeMap<String, Vec<(Duration, SerializedValue)>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_ignores_argument_insertion_order() {
        let a = ConstraintRecord::edsl(1, 10, "Limit", "src").with_argument("max", 5i64).with_argument("min", 1i64);
        let b = ConstraintRecord::edsl(1, 10, "Limit", "src").with_argument("min", 1i64).with_argument("max", 5i64);
        assert_eq!(a.cache_key(3), b.cache_key(3));
        assert_eq!(a.cache_key(3).arguments, r#"{"max":5,"min":1}"#);
    }

    #[test]
    fn test_cache_key_tracks_revision_and_dataset() {
        let record = ConstraintRecord::edsl(1, 10, "Limit", "src");
        assert_ne!(record.cache_key(3), record.cache_key(4));
        assert_ne!(record.cache_key(3), record.clone().with_revision(1).cache_key(3));
    }

    #[test]
    fn test_record_json_shape() {
        let record: ConstraintRecord = serde_json::from_value(serde_json::json!({
            "priority": 2,
            "invocationId": 7,
            "constraintId": 3,
            "revision": 1,
            "name": "PeelCheck",
            "constraintType": { "type": "procedure", "path": "peel.wasm" }
        }))
        .unwrap();
        assert_eq!(record.constraint_type, ConstraintType::Procedure { path: "peel.wasm".into() });
        assert!(record.arguments.is_empty());
    }
}
