//! Step tool handlers for the durable step SDK.
//!
//! Each handler turns one step tool call into a planned op, resolves it from
//! the memoized results when possible, and otherwise records it as the
//! invocation's next op and returns the interrupt signal.

pub mod replay;
pub mod run;
pub mod sleep;
pub mod wait_for_event;

pub use replay::{check_replay, check_replay_status, ReplayResult};
pub use run::run_handler;
pub use sleep::{sleep_handler, sleep_until_handler};
pub use wait_for_event::{wait_for_event_handler, WaitForEventOpts};

use crate::error::StepError;

/// Fails fast with a Definition error when a step tool argument is empty.
pub(crate) fn require_non_empty(value: &str, what: &str) -> Result<(), StepError> {
    if value.trim().is_empty() {
        return Err(StepError::definition(format!("{} must not be empty", what)));
    }
    Ok(())
}
