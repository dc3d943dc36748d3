use super::error::ConstraintError;
use super::record::ConstraintRecord;
use crate::model::ConstraintResult;

/// Where a run's outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSource {
    Cached,
    Evaluated,
    Failed,
}

pub type ConstraintOutcome = Result<ConstraintResult, Vec<ConstraintError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRun {
    pub record: ConstraintRecord,
    pub outcome: ConstraintOutcome,
    pub source: RunSource,
}

impl ConstraintRun {
    pub fn evaluated(record: ConstraintRecord, result: ConstraintResult) -> Self {
        Self { record, outcome: Ok(result), source: RunSource::Evaluated }
    }

    pub fn failed(record: ConstraintRecord, errors: Vec<ConstraintError>) -> Self {
        Self { record, outcome: Err(errors), source: RunSource::Failed }
    }

    pub fn cached(record: ConstraintRecord, outcome: ConstraintOutcome) -> Self {
        Self { record, outcome, source: RunSource::Cached }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&ConstraintResult> {
        self.outcome.as_ref().ok()
    }

    pub fn errors(&self) -> &[ConstraintError] {
        match &self.outcome {
            Ok(_) => &[],
            Err(errors) => errors,
        }
    }
}

/// Every run of one request, in ascending priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintResultMap {
    runs: Vec<ConstraintRun>,
}

impl ConstraintResultMap {
    /// Sorts by priority. Runs of equal priority keep their relative order.
    pub fn new(mut runs: Vec<ConstraintRun>) -> Self {
        runs.sort_by_key(|run| run.record.priority);
        Self { runs }
    }

    pub fn get(&self, invocation_id: i64) -> Option<&ConstraintRun> {
        self.runs.iter().find(|run| run.record.invocation_id == invocation_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConstraintRun> {
        self.runs.iter()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConstraintRun> {
        self.runs.iter().filter(|run| !run.is_success())
    }
}

impl IntoIterator for ConstraintResultMap {
    type Item = ConstraintRun;
    type IntoIter = std::vec::IntoIter<ConstraintRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(invocation_id: i64, priority: i64) -> ConstraintRun {
        let record = ConstraintRecord::edsl(invocation_id, invocation_id, "c", "").with_priority(priority);
        ConstraintRun::evaluated(record, ConstraintResult::default())
    }

    #[test]
    fn test_orders_by_priority_stably() {
        let map = ConstraintResultMap::new(vec![run(1, 5), run(2, 0), run(3, 5), run(4, -1)]);
        let order: Vec<i64> = map.iter().map(|r| r.record.invocation_id).collect();
        assert_eq!(order, vec![4, 2, 1, 3]);
    }

    #[test]
    fn test_lookup_and_failures() {
        let failed = ConstraintRun::failed(ConstraintRecord::edsl(9, 9, "bad", ""), vec![ConstraintError::Internal]);
        let map = ConstraintResultMap::new(vec![run(1, 0), failed]);
        assert!(map.get(1).is_some_and(|r| r.is_success()));
        assert_eq!(map.get(9).map(|r| r.errors().len()), Some(1));
        assert_eq!(map.failures().count(), 1);
        assert!(map.get(2).is_none());
    }
}
