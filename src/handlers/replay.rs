//! Replay detection shared by all step handlers.
//!
//! A planned op either carries a memoized result, in which case the handler
//! returns it without running anything, or it does not and the handler
//! proceeds to record it as the next op.

use serde::de::DeserializeOwned;

use crate::error::StepError;
use crate::operation::StepResult;
use crate::serdes::from_step_data;
use crate::state::PlannedOp;

/// Result of replay detection.
#[derive(Debug)]
pub enum ReplayResult<T> {
    /// The op was memoized; this is its stored value
    Replayed(T),
    /// No memoized result, the op is new
    NotFound,
}

impl<T> ReplayResult<T> {
    /// Returns true if the op was memoized.
    pub fn is_replayed(&self) -> bool {
        matches!(self, Self::Replayed(_))
    }
}

/// Checks a planned op for a memoized result and deserializes it.
///
/// # Returns
///
/// - `Ok(ReplayResult::Replayed(value))` - the op was memoized with data
/// - `Ok(ReplayResult::NotFound)` - the op is new
/// - `Err(StepError::StepFailed)` - the op was memoized with a failure marker
/// - `Err(StepError::SerDes)` - the stored data does not fit `T`
pub fn check_replay<T>(planned: &PlannedOp) -> Result<ReplayResult<T>, StepError>
where
    T: DeserializeOwned,
{
    match &planned.memoized {
        None => Ok(ReplayResult::NotFound),
        Some(StepResult::Data(data)) => {
            tracing::debug!(op = %planned.op.op, id = %planned.op.id, hash = %planned.op.hash, "Replayed step from memoized result");
            from_step_data(data, &planned.op).map(ReplayResult::Replayed)
        }
        Some(StepResult::Error(error)) => {
            tracing::debug!(op = %planned.op.op, id = %planned.op.id, hash = %planned.op.hash, "Replayed failed step");
            Err(StepError::StepFailed {
                id: planned.op.id.clone(),
                error: error.clone(),
            })
        }
    }
}

/// Checks a planned op for a memoized result without deserializing it.
///
/// Used by ops such as `sleep` whose result carries no value.
/// Returns `Ok(true)` when memoized.
pub fn check_replay_status(planned: &PlannedOp) -> Result<bool, StepError> {
    match &planned.memoized {
        None => Ok(false),
        Some(StepResult::Data(_)) => Ok(true),
        Some(StepResult::Error(error)) => Err(StepError::StepFailed {
            id: planned.op.id.clone(),
            error: error.clone(),
        }),
    }
}
