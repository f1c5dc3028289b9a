//! Wait-for-event handler.
//!
//! A waiting step is identified by the awaited event name plus its match
//! expression and TTL. The orchestrator resolves it with the first matching
//! event, or with `null` once the TTL has passed.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::context::create_step_span;
use crate::duration::{instant_key, Timeout};
use crate::error::StepError;
use crate::hash::OpIdentity;
use crate::matching::{build_match_expression, MatchOn};
use crate::operation::{OpOpts, StepOpCode};
use crate::state::SharedExecutionState;

use super::replay::{check_replay, ReplayResult};
use super::require_non_empty;

/// Options for a `wait_for_event` step.
///
/// `match_on` takes priority over `if_expr` when both are set.
///
/// # Example
///
/// ```
/// use durable_step_sdk::handlers::WaitForEventOpts;
///
/// let opts = WaitForEventOpts::new()
///     .with_timeout("2h")
///     .with_match("user.id");
/// assert!(opts.timeout.is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaitForEventOpts {
    /// How long to wait before resolving with no event
    pub timeout: Option<Timeout>,
    /// Field-based match on the awaited event
    pub match_on: Option<MatchOn>,
    /// Raw match expression, used verbatim
    pub if_expr: Option<String>,
}

impl WaitForEventOpts {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: impl Into<Timeout>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Sets the field-based match.
    pub fn with_match(mut self, match_on: impl Into<MatchOn>) -> Self {
        self.match_on = Some(match_on.into());
        self
    }

    /// Sets the raw match expression.
    pub fn with_if(mut self, expr: impl Into<String>) -> Self {
        self.if_expr = Some(expr.into());
        self
    }

    /// Resolves these options into the op's emitted options.
    pub fn to_op_opts(&self, now: DateTime<Utc>) -> Result<OpOpts, StepError> {
        if let Some(Timeout::After(token)) = &self.timeout {
            require_non_empty(token.as_str(), "wait_for_event timeout")?;
        }
        Ok(OpOpts {
            match_expr: build_match_expression(self.match_on.as_ref(), self.if_expr.as_deref())?,
            ttl: self.timeout.as_ref().map(|timeout| timeout.to_ttl(now)),
        })
    }

    /// Returns the options that identify the op; an absolute timeout is
    /// identified by its instant rather than the remaining time.
    fn identity_opts(&self, emitted: &OpOpts) -> OpOpts {
        match &self.timeout {
            Some(Timeout::At(instant)) => OpOpts {
                match_expr: emitted.match_expr.clone(),
                ttl: Some(instant_key(*instant)),
            },
            _ => emitted.clone(),
        }
    }
}

/// Executes a `wait_for_event` step.
///
/// # Returns
///
/// - `Ok(Some(event))` when the wait was memoized with a matching event
/// - `Ok(None)` when the wait was memoized as timed out
/// - `Err(StepError::Interrupt)` after recording a new wait
/// - `Err(StepError::Definition)` for an empty event name or match field
pub async fn wait_for_event_handler<T>(
    event: &str,
    opts: &WaitForEventOpts,
    now: DateTime<Utc>,
    state: &SharedExecutionState,
) -> Result<Option<T>, StepError>
where
    T: DeserializeOwned,
{
    require_non_empty(event, "wait_for_event event name")?;
    let op_opts = opts.to_op_opts(now)?;
    let identity = OpIdentity::new(event, opts.identity_opts(&op_opts));

    let planned =
        state
            .lock()
            .await
            .plan_with_identity(StepOpCode::WaitForEvent, event, op_opts, identity)?;

    if let ReplayResult::Replayed(resolved) = check_replay::<Option<T>>(&planned)? {
        return Ok(resolved);
    }

    let span = create_step_span(&planned.op);
    span.record("status", "waiting");
    let mut guard = state.lock().await;
    Err(span.in_scope(|| guard.suspend(planned.op)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{StepOp, StepResult};
    use crate::state::ExecutionState;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::collections::HashMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    async fn recorded(opts: WaitForEventOpts) -> StepOp {
        let state = ExecutionState::empty().into_shared();
        let result = wait_for_event_handler::<Value>("event", &opts, now(), &state).await;
        assert!(result.unwrap_err().is_interrupt());
        let op = state.lock().await.next_op().cloned().unwrap();
        op
    }

    #[tokio::test]
    async fn test_no_options() {
        let op = recorded(WaitForEventOpts::new()).await;
        assert_eq!(op.op, StepOpCode::WaitForEvent);
        assert_eq!(op.id, "event");
        assert!(op.opts.is_empty());
        assert_eq!(op.hash, "f502ede21ad045e90a78c6c55e3feb235cd034f3");
    }

    #[tokio::test]
    async fn test_string_timeout_is_ttl() {
        let op = recorded(WaitForEventOpts::new().with_timeout("1m")).await;
        assert_eq!(op.opts.ttl.as_deref(), Some("1m"));
        assert_eq!(op.hash, "5e3976075e62219112ab405dcc9d05dbbf235023");
    }

    #[tokio::test]
    async fn test_date_timeout_is_converted() {
        let until = now() + chrono::Duration::days(6) + chrono::Duration::hours(1);
        let op = recorded(WaitForEventOpts::new().with_timeout(until)).await;
        let ttl = op.opts.ttl.unwrap();
        assert!(ttl.contains("6d"), "ttl was {}", ttl);
    }

    #[tokio::test]
    async fn test_match_field() {
        let op = recorded(WaitForEventOpts::new().with_match("name")).await;
        assert_eq!(
            op.opts.match_expr.as_deref(),
            Some("event.name == async.name")
        );
        assert_eq!(op.hash, "7a6413ebe72fd4f6f48b20d72682a15978bca501");
    }

    #[tokio::test]
    async fn test_match_number_is_bare() {
        let op = recorded(WaitForEventOpts::new().with_match(("name", 123))).await;
        assert_eq!(op.opts.match_expr.as_deref(), Some("async.name == 123"));
        assert_eq!(op.hash, "6efbac36e6013774151e223945e1d232e1a0e728");
    }

    #[tokio::test]
    async fn test_match_string_is_quoted() {
        let op = recorded(WaitForEventOpts::new().with_match(("name", "123"))).await;
        assert_eq!(op.opts.match_expr.as_deref(), Some("async.name == '123'"));
        assert_eq!(op.hash, "a86fb6eed68ad7b7681cfcb8de5947fe1f69ce6b");
    }

    #[tokio::test]
    async fn test_if_is_verbatim() {
        let op = recorded(WaitForEventOpts::new().with_if("name == 123")).await;
        assert_eq!(op.opts.match_expr.as_deref(), Some("name == 123"));
        assert_eq!(op.hash, "263f53c7621ae6f229dc4fceba330cd3a2a30a65");
    }

    #[tokio::test]
    async fn test_match_wins_over_if() {
        let op = recorded(
            WaitForEventOpts::new()
                .with_if("name == 123")
                .with_match("name"),
        )
        .await;
        assert_eq!(
            op.opts.match_expr.as_deref(),
            Some("event.name == async.name")
        );
    }

    #[tokio::test]
    async fn test_memoized_event_is_returned() {
        let mut memoized = HashMap::new();
        memoized.insert(
            "f502ede21ad045e90a78c6c55e3feb235cd034f3".to_string(),
            StepResult::Data(json!({ "name": "event", "data": { "ok": true } })),
        );
        let state = ExecutionState::new(memoized).into_shared();

        let event: Option<Value> =
            wait_for_event_handler("event", &WaitForEventOpts::new(), now(), &state)
                .await
                .unwrap();

        assert_eq!(event.unwrap()["data"]["ok"], json!(true));
        assert!(!state.lock().await.has_next_op());
    }

    #[tokio::test]
    async fn test_memoized_timeout_is_none() {
        let mut memoized = HashMap::new();
        memoized.insert(
            "5e3976075e62219112ab405dcc9d05dbbf235023".to_string(),
            StepResult::Data(Value::Null),
        );
        let state = ExecutionState::new(memoized).into_shared();
        let opts = WaitForEventOpts::new().with_timeout("1m");

        let event: Option<Value> = wait_for_event_handler("event", &opts, now(), &state)
            .await
            .unwrap();

        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_date_timeout_replays_at_a_later_time() {
        let until = now() + chrono::Duration::hours(2);
        let opts = WaitForEventOpts::new().with_timeout(until);
        let first = recorded(opts.clone()).await;
        assert_eq!(first.opts.ttl.as_deref(), Some("2h"));

        let mut memoized = HashMap::new();
        memoized.insert(first.hash.clone(), StepResult::Data(json!({ "name": "event" })));
        let state = ExecutionState::new(memoized).into_shared();
        let later = now() + chrono::Duration::minutes(17);

        let event: Option<Value> = wait_for_event_handler("event", &opts, later, &state)
            .await
            .unwrap();
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn test_empty_event_name_is_definition_error() {
        let state = ExecutionState::empty().into_shared();
        let result =
            wait_for_event_handler::<Value>("", &WaitForEventOpts::new(), now(), &state).await;
        assert!(result.unwrap_err().is_definition());
    }

    #[tokio::test]
    async fn test_empty_match_field_is_definition_error() {
        let state = ExecutionState::empty().into_shared();
        let opts = WaitForEventOpts::new().with_match("");
        let result = wait_for_event_handler::<Value>("event", &opts, now(), &state).await;
        assert!(result.unwrap_err().is_definition());
        assert_eq!(state.lock().await.position(), 0);
    }
}
