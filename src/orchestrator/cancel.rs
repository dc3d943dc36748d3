use super::error::ConstraintError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative stop signal shared between a request and whoever may abort it.
///
/// Checked between constraints only. A constraint that has started always finishes.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Decides, before each constraint, whether the request may still start it.
#[derive(Debug)]
pub(crate) struct BatchGuard<'t> {
    token: &'t CancellationToken,
    started: Instant,
    time_limit: Option<std::time::Duration>,
}

impl<'t> BatchGuard<'t> {
    pub(crate) fn start(token: &'t CancellationToken, time_limit: Option<std::time::Duration>) -> Self {
        Self { token, started: Instant::now(), time_limit }
    }

    /// The failure to record instead of evaluating, if the request has been stopped.
    pub(crate) fn interruption(&self) -> Option<ConstraintError> {
        if self.token.is_cancelled() {
            return Some(ConstraintError::Cancelled);
        }
        match self.time_limit {
            Some(limit) if self.started.elapsed() >= limit => {
                Some(ConstraintError::TimedOut { limit_ms: limit.as_millis() as u64 })
            }
            _ => None,
        }
    }
}
