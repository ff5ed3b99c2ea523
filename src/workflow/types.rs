use crate::error::{AppError, Result};
use crate::mayhem::RunHandle;

/// Terminal outcome of the run lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// `run` produced no handle; nothing was scheduled.
    NotStarted { reason: String },
    /// Scheduled; no synchronous result was requested so `wait` was skipped.
    Scheduled { handle: RunHandle },
    /// Waited on and finished with a non-failure status.
    Completed { handle: RunHandle, status: String },
    /// Status contains `stopped`.
    Stopped { handle: RunHandle, status: String },
    /// Status contains `failed`.
    Failed { handle: RunHandle, status: String },
    /// `wait` (or the status lookup after it) did not succeed.
    WaitError { handle: RunHandle, reason: String },
}

impl RunOutcome {
    /// Classify a status reported by `show`.
    ///
    /// Substring match: composite statuses such as `build-failed` count.
    pub fn from_status(handle: RunHandle, status: String) -> Self {
        if status.contains("stopped") {
            RunOutcome::Stopped { handle, status }
        } else if status.contains("failed") {
            RunOutcome::Failed { handle, status }
        } else {
            RunOutcome::Completed { handle, status }
        }
    }

    pub fn handle(&self) -> Option<&RunHandle> {
        match self {
            RunOutcome::NotStarted { .. } => None,
            RunOutcome::Scheduled { handle }
            | RunOutcome::Completed { handle, .. }
            | RunOutcome::Stopped { handle, .. }
            | RunOutcome::Failed { handle, .. }
            | RunOutcome::WaitError { handle, .. } => Some(handle),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunOutcome::Scheduled { .. } | RunOutcome::Completed { .. }
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Scheduled { .. } | RunOutcome::Completed { .. } => 0,
            RunOutcome::NotStarted { .. } => 1,
            RunOutcome::Stopped { .. } | RunOutcome::Failed { .. } => 2,
            RunOutcome::WaitError { .. } => 3,
        }
    }

    /// Turn failure outcomes into the matching error.
    pub fn into_result(self) -> Result<Self> {
        match self {
            RunOutcome::NotStarted { reason } => Err(AppError::Schedule(reason)),
            RunOutcome::Stopped { status, .. } | RunOutcome::Failed { status, .. } => {
                Err(AppError::ScanFailed(status))
            }
            RunOutcome::WaitError { reason, .. } => Err(AppError::Wait(reason)),
            outcome => Ok(outcome),
        }
    }
}
