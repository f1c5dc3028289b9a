//! Core types for the testing utilities crate.

use chrono::{DateTime, Utc};
use durable_step_sdk::{InvocationStatus, StepOp};
use serde::{Deserialize, Serialize};

/// Status of a function run under test.
///
/// # Examples
///
/// ```
/// use durable_step_sdk_testing::ExecutionStatus;
///
/// let status = ExecutionStatus::Succeeded;
/// assert!(status.is_terminal());
/// assert!(status.is_success());
///
/// let running = ExecutionStatus::Running;
/// assert!(!running.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The invocation limit was reached with a step still pending
    Running,
    /// The handler returned a value
    Succeeded,
    /// The handler failed
    Failed,
}

impl ExecutionStatus {
    /// Returns true if the run finished.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns true if the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the run failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// One handler invocation made by the local runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Start timestamp
    pub start_timestamp: DateTime<Utc>,
    /// End timestamp
    pub end_timestamp: DateTime<Utc>,
    /// Outcome reported by the invocation boundary
    pub status: InvocationStatus,
    /// The op reported when pending
    pub op: Option<StepOp>,
    /// Attempt number passed to the handler
    pub attempt: u32,
}

impl Invocation {
    /// Returns the wall-clock duration of the invocation.
    pub fn duration(&self) -> chrono::Duration {
        self.end_timestamp - self.start_timestamp
    }
}
