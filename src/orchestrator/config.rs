use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tuning for a [`ConstraintAction`](super::ConstraintAction). Every field has a default,
/// so an empty JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Evaluate constraints on the rayon pool instead of one after another.
    pub parallel: bool,
    /// Wall-clock budget for one request. Constraints not started in time fail.
    pub batch_timeout_ms: Option<u64>,
    /// Whether stored runs that failed may answer a later request.
    pub reuse_failed_runs: bool,
    /// Directory that procedure constraint paths are resolved against.
    pub procedure_root: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            batch_timeout_ms: None,
            reuse_failed_runs: true,
            procedure_root: PathBuf::from("."),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn batch_timeout(&self) -> Option<std::time::Duration> {
        self.batch_timeout_ms.map(std::time::Duration::from_millis)
    }
}

/// The request parameters recorded alongside the runs they produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintRequestConfiguration {
    pub plan_id: i64,
    pub simulation_dataset_id: i64,
    pub force: bool,
    pub requesting_user: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(OrchestratorConfig::from_json("{}").unwrap(), OrchestratorConfig::default());
    }

    #[rstest]
    #[case(r#"{"parallel": true}"#, true, None)]
    #[case(r#"{"batch_timeout_ms": 250}"#, false, Some(250))]
    fn test_partial_documents(#[case] json: &str, #[case] parallel: bool, #[case] timeout: Option<u64>) {
        let config = OrchestratorConfig::from_json(json).unwrap();
        assert_eq!(config.parallel, parallel);
        assert_eq!(config.batch_timeout_ms, timeout);
        assert!(config.reuse_failed_runs);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(OrchestratorConfig::from_json(r#"{"parallel": "yes"}"#).is_err());
    }
}
