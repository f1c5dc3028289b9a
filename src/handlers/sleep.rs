//! Sleep handlers.
//!
//! A sleep op's id is the duration token itself. The orchestrator resumes
//! the function once the duration has passed, at which point the op is
//! memoized with a `null` result.

use chrono::{DateTime, Utc};

use crate::context::create_step_span;
use crate::duration::{instant_key, time_str_until, TimeStr};
use crate::error::StepError;
use crate::hash::OpIdentity;
use crate::operation::{OpOpts, StepOpCode};
use crate::state::{PlannedOp, SharedExecutionState};

use super::replay::check_replay_status;
use super::require_non_empty;

/// Executes a `sleep` step for a relative duration token.
///
/// Returns `Ok(())` once the sleep is memoized, otherwise records the op and
/// returns the interrupt signal.
pub async fn sleep_handler(
    duration: TimeStr,
    state: &SharedExecutionState,
) -> Result<(), StepError> {
    require_non_empty(duration.as_str(), "sleep duration")?;

    let planned = state
        .lock()
        .await
        .plan(StepOpCode::Sleep, duration.as_str(), OpOpts::default())?;

    settle(planned, state).await
}

/// Executes a `sleep` step until an absolute instant.
///
/// The emitted id is the token for the time remaining from `now`; the op is
/// identified by `until` itself so that later replays resolve it.
pub async fn sleep_until_handler(
    until: DateTime<Utc>,
    now: DateTime<Utc>,
    state: &SharedExecutionState,
) -> Result<(), StepError> {
    let token = time_str_until(until, now);
    let identity = OpIdentity::new(instant_key(until), OpOpts::default());

    let planned = state.lock().await.plan_with_identity(
        StepOpCode::Sleep,
        &token,
        OpOpts::default(),
        identity,
    )?;

    settle(planned, state).await
}

async fn settle(planned: PlannedOp, state: &SharedExecutionState) -> Result<(), StepError> {
    if check_replay_status(&planned)? {
        return Ok(());
    }

    let span = create_step_span(&planned.op);
    span.record("status", "sleeping");
    let mut guard = state.lock().await;
    Err(span.in_scope(|| guard.suspend(planned.op)))
}
