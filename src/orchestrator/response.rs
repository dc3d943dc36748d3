//! The JSON document returned to clients for one constraint request.
use super::error::ConstraintError;
use super::results::{ConstraintResultMap, ConstraintRun};
use serde_json::{json, Map, Value};

pub fn serialize_constraint_results(request_id: i64, runs: &ConstraintResultMap) -> Value {
    json!({
        "success": true,
        "requestId": request_id,
        "constraintsRun": runs.iter().map(serialize_run).collect::<Vec<_>>(),
    })
}

pub fn serialize_run(run: &ConstraintRun) -> Value {
    let record = &run.record;
    let results = match run.result() {
        Some(result) => serde_json::to_value(result).unwrap_or_default(),
        None => Value::Object(Map::new()),
    };
    json!({
        "success": run.is_success(),
        "constraintId": record.constraint_id,
        "constraintInvocationId": record.invocation_id,
        "constraintName": record.name,
        "constraintRevision": record.revision,
        "errors": run.errors().iter().map(serialize_error).collect::<Vec<_>>(),
        "results": results,
    })
}

fn serialize_error(error: &ConstraintError) -> Value {
    let location = match error.location() {
        Some(location) => json!({ "line": location.line, "column": location.column }),
        None => Value::Object(Map::new()),
    };
    json!({
        "message": error.to_string(),
        "stack": error.stack(),
        "location": location,
    })
}
