//! Human-readable renderings of constraint results.
pub mod report;

pub use report::{format_report, ConstraintReport};
