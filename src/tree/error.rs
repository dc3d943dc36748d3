//! Runtime evaluation errors. Each one fails only the constraint being evaluated.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("No such resource: '{name}'")]
    NoSuchResource { name: String },

    #[error("Resource '{name}' holds non-numeric values and cannot be used as a real profile")]
    NotNumeric { name: String },

    #[error("Activity alias '{alias}' is not bound")]
    UnboundAlias { alias: String },

    #[error("Interval alias '{alias}' is not bound")]
    NoSuchInterval { alias: String },

    #[error("Operands of '{operation}' cover no common time")]
    DisjointBounds { operation: &'static str },

    #[error("Violation references directive {directive_id}, which has no simulated instance")]
    UnknownDirective { directive_id: i64 },

    #[error("Procedure failed: {message}")]
    Procedure { message: String },
}
