//! Errors raised while checking a plan's constraints.
//!
//! [`ConstraintActionError`] aborts the whole request before anything is evaluated.
//! [`ConstraintError`] is attached to a single constraint's run and never stops the
//! other constraints in the batch.
use crate::analysis::ScopeError;
use crate::tree::EvaluationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintActionError {
    #[error("No plan exists with id {0}")]
    NoSuchPlan(i64),

    #[error("No mission model exists with id {0}")]
    NoSuchMissionModel(i64),

    #[error("{0}")]
    InputMismatch(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Constraint store failure: {0}")]
pub struct StoreError(pub String);

/// Line and column reported by the constraint compiler, both 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub stack: String,
    pub location: CodeLocation,
}

impl CompileError {
    pub fn new(message: impl Into<String>, stack: impl Into<String>, location: CodeLocation) -> Self {
        Self { message: message.into(), stack: stack.into(), location }
    }

    /// Names the constraint that failed in front of the compiler's own message.
    pub(crate) fn for_constraint(mut self, constraint_name: &str) -> Self {
        self.message = format!("Constraint '{}' compilation failed:\n {}", constraint_name, self.message);
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("{0}")]
    Compilation(CompileError),

    #[error("{0}")]
    Scope(ScopeError),

    #[error("Failed to load constraint procedure '{path}': {message}")]
    ProcedureLoad { path: String, message: String },

    #[error("{0}")]
    Runtime(EvaluationError),

    #[error("Constraint checking was cancelled before this constraint ran")]
    Cancelled,

    #[error("Constraint checking exceeded its time limit of {limit_ms} ms before this constraint ran")]
    TimedOut { limit_ms: u64 },

    #[error("Internal error processing a constraint")]
    Internal,
}

impl ConstraintError {
    /// Source position, only known for compilation failures.
    pub fn location(&self) -> Option<CodeLocation> {
        match self {
            ConstraintError::Compilation(error) => Some(error.location),
            _ => None,
        }
    }

    pub fn stack(&self) -> &str {
        match self {
            ConstraintError::Compilation(error) => &error.stack,
            _ => "",
        }
    }

    /// Failures that say nothing about the constraint itself and must not be reused
    /// by a later request.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConstraintError::Cancelled | ConstraintError::TimedOut { .. } | ConstraintError::Internal)
    }
}

impl From<EvaluationError> for ConstraintError {
    fn from(error: EvaluationError) -> Self {
        ConstraintError::Runtime(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_names_the_constraint() {
        let error = CompileError::new("Unexpected token", "at line 2", CodeLocation { line: 2, column: 7 })
            .for_constraint("ConstFruit");
        assert_eq!(error.message, "Constraint 'ConstFruit' compilation failed:\n Unexpected token");
        let wrapped = ConstraintError::Compilation(error);
        assert_eq!(wrapped.location(), Some(CodeLocation { line: 2, column: 7 }));
        assert_eq!(wrapped.stack(), "at line 2");
    }

    #[test]
    fn test_runtime_errors_carry_no_location() {
        let error: ConstraintError = EvaluationError::NoSuchResource { name: "/peel".into() }.into();
        assert_eq!(error.location(), None);
        assert_eq!(error.to_string(), "No such resource: '/peel'");
        assert!(!error.is_transient());
        assert!(ConstraintError::TimedOut { limit_ms: 5 }.is_transient());
    }

    #[test]
    fn test_store_errors_abort_the_request() {
        let error: ConstraintActionError = StoreError("connection refused".into()).into();
        assert_eq!(error.to_string(), "Constraint store failure: connection refused");
    }
}
