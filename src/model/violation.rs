//! Violations and the per-constraint result record.
use crate::time::Interval;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Activity ids responsible for a violation, innermost iteration first.
pub type ActivityIds = SmallVec<[i64; 4]>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub windows: Vec<Interval>,
    pub activity_instance_ids: ActivityIds,
    /// How many leading ids were added by enclosing iterations.
    #[serde(skip)]
    attributed: usize,
}

impl Violation {
    pub fn new(windows: Vec<Interval>, activity_instance_ids: impl IntoIterator<Item = i64>) -> Self {
        Self { windows, activity_instance_ids: activity_instance_ids.into_iter().collect(), attributed: 0 }
    }

    /// Records an enclosing iteration's activity.
    ///
    /// The id goes after those recorded by iterations nested deeper and before the ids
    /// the violation was created with, so the list reads innermost to outermost.
    pub fn add_activity_id(&mut self, activity_id: i64) {
        self.activity_instance_ids.insert(self.attributed, activity_id);
        self.attributed += 1;
    }
}

impl PartialEq for Violation {
    fn eq(&self, other: &Self) -> bool {
        self.windows == other.windows && self.activity_instance_ids == other.activity_instance_ids
    }
}

/// Outcome of one constraint evaluation. Metadata stays empty until the
/// orchestrator attaches it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintResult {
    pub violations: Vec<Violation>,
    pub gaps: Vec<Interval>,
    pub resource_ids: BTreeSet<String>,
    pub constraint_id: Option<i64>,
    pub constraint_revision: Option<i64>,
    pub constraint_name: Option<String>,
}

impl ConstraintResult {
    pub fn new(violations: Vec<Violation>, gaps: Vec<Interval>) -> Self {
        Self { violations, gaps, ..Default::default() }
    }

    /// Concatenates violations and gaps. Intervals are not unioned.
    pub fn merge(mut self, other: ConstraintResult) -> Self {
        self.violations.extend(other.violations);
        self.gaps.extend(other.gaps);
        self.resource_ids.extend(other.resource_ids);
        self
    }

    pub fn with_resource_ids(mut self, resource_ids: BTreeSet<String>) -> Self {
        self.resource_ids = resource_ids;
        self
    }

    pub fn with_metadata(mut self, constraint_id: i64, revision: i64, name: impl Into<String>) -> Self {
        self.constraint_id = Some(constraint_id);
        self.constraint_revision = Some(revision);
        self.constraint_name = Some(name.into());
        self
    }

    pub fn is_satisfied(&self) -> bool {
        self.violations.is_empty()
    }
}
