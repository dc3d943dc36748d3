use crate::model::{ConstraintResult, Violation};
use crate::orchestrator::{ConstraintError, ConstraintResultMap, ConstraintRun, RunSource};
use crate::time::Interval;
use std::fmt;

/// Renders a request's runs as an indented tree, one branch per constraint.
pub fn format_report(request_id: i64, runs: &ConstraintResultMap) -> String {
    ConstraintReport { request_id, runs }.to_string()
}

pub struct ConstraintReport<'a> {
    pub request_id: i64,
    pub runs: &'a ConstraintResultMap,
}

impl fmt::Display for ConstraintReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CONSTRAINT REPORT for request {}:", self.request_id)?;
        writeln!(f, "--------------------------------------------------")?;
        if self.runs.is_empty() {
            writeln!(f, "(no constraints)")?;
        }
        let count = self.runs.len();
        for (i, run) in self.runs.iter().enumerate() {
            write_run(f, run, connector(i, count))?;
        }
        Ok(())
    }
}

fn write_run(f: &mut fmt::Formatter<'_>, run: &ConstraintRun, prefix: &str) -> fmt::Result {
    let record = &run.record;
    let status = match &run.outcome {
        Ok(result) if result.is_satisfied() => "OK",
        Ok(_) => "VIOLATED",
        Err(_) => "FAILED",
    };
    let source = match run.source {
        RunSource::Cached => "cached",
        RunSource::Evaluated => "evaluated",
        RunSource::Failed => "failed",
    };
    writeln!(
        f,
        "{}[P{}] {} (#{}) {} [{}]",
        prefix, record.priority, record.name, record.invocation_id, status, source
    )?;

    let stem = child_stem(prefix);
    match &run.outcome {
        Ok(result) => write_result(f, &stem, result),
        Err(errors) => {
            for (i, error) in errors.iter().enumerate() {
                write_error(f, &format!("{}{}", stem, connector(i, errors.len())), error)?;
            }
            Ok(())
        }
    }
}

fn write_result(f: &mut fmt::Formatter<'_>, stem: &str, result: &ConstraintResult) -> fmt::Result {
    let lines = result.violations.len() + usize::from(!result.gaps.is_empty());
    for (i, violation) in result.violations.iter().enumerate() {
        writeln!(f, "{}{}{}", stem, connector(i, lines), describe(violation))?;
    }
    if !result.gaps.is_empty() {
        writeln!(f, "{}`-- Gaps: {}", stem, windows(&result.gaps))?;
    }
    Ok(())
}

fn write_error(f: &mut fmt::Formatter<'_>, prefix: &str, error: &ConstraintError) -> fmt::Result {
    // Multi-line compiler messages stay on one line.
    let message = error.to_string().replace('\n', " ");
    match error.location() {
        Some(location) => writeln!(f, "{}Error at {}:{}: {}", prefix, location.line, location.column, message),
        None => writeln!(f, "{}Error: {}", prefix, message),
    }
}

fn describe(violation: &Violation) -> String {
    if violation.activity_instance_ids.is_empty() {
        format!("Violated {}", windows(&violation.windows))
    } else {
        format!("Violated {} by activities {:?}", windows(&violation.windows), violation.activity_instance_ids.as_slice())
    }
}

fn windows(intervals: &[Interval]) -> String {
    intervals.iter().map(Interval::to_string).collect::<Vec<_>>().join(", ")
}

fn connector(index: usize, count: usize) -> &'static str {
    if index + 1 == count {
        "`-- "
    } else {
        "|-- "
    }
}

fn child_stem(prefix: &str) -> String {
    prefix.replace("`-- ", "    ").replace("|-- ", "|   ")
}
