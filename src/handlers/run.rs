//! Run step handler.
//!
//! A `run` step wraps user code. On replay the memoized value is returned
//! and the code is not executed. Otherwise the code runs once, its outcome
//! (value or failure marker) is attached to the op, and the invocation is
//! interrupted so the orchestrator can persist it.

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::Instrument;

use crate::context::create_step_span;
use crate::error::{ErrorObject, StepError};
use crate::operation::{OpOpts, StepOpCode};
use crate::serdes::to_step_data;
use crate::state::SharedExecutionState;

use super::replay::{check_replay, ReplayResult};
use super::require_non_empty;

/// Executes a `run` step.
///
/// # Returns
///
/// - `Ok(value)` when the step was memoized with data
/// - `Err(StepError::StepFailed)` when the step was memoized with a failure marker
/// - `Err(StepError::Interrupt)` after running `func` and recording its outcome
/// - `Err(StepError::Definition)` when `id` is empty
///
/// A failure of `func` is never returned here; it is captured on the op.
pub async fn run_handler<T, F, Fut>(
    id: &str,
    func: F,
    state: &SharedExecutionState,
) -> Result<T, StepError>
where
    T: Serialize + DeserializeOwned + Send,
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, Box<dyn std::error::Error + Send + Sync>>> + Send,
{
    require_non_empty(id, "run step id")?;

    let planned = state
        .lock()
        .await
        .plan(StepOpCode::RunStep, id, OpOpts::default())?;

    if let ReplayResult::Replayed(value) = check_replay::<T>(&planned)? {
        return Ok(value);
    }

    let span = create_step_span(&planned.op);
    let outcome = func().instrument(span.clone()).await;

    let op = match outcome {
        Ok(value) => {
            let data = match to_step_data(&value, &planned.op) {
                Ok(data) => data,
                Err(error) => {
                    state.lock().await.release(&planned.op.hash);
                    return Err(error);
                }
            };
            span.record("status", "succeeded");
            planned.op.with_data(data)
        }
        Err(error) => {
            let error = ErrorObject::from_error(&*error);
            span.record("status", "failed");
            span.in_scope(|| tracing::debug!(message = %error.message, "Step function failed"));
            planned.op.with_error(error)
        }
    };

    let mut guard = state.lock().await;
    Err(span.in_scope(|| guard.suspend(op)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::StepResult;
    use crate::state::ExecutionState;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const RUN_STEP: &str = "5509b491cbbcbe4fac8d3d7f3ced607579178f60";

    type BoxError = Box<dyn std::error::Error + Send + Sync>;

    fn replaying(result: StepResult) -> SharedExecutionState {
        let mut memoized = HashMap::new();
        memoized.insert(RUN_STEP.to_string(), result);
        ExecutionState::new(memoized).into_shared()
    }

    #[tokio::test]
    async fn test_new_step_records_data_and_interrupts() {
        let state = ExecutionState::empty().into_shared();

        let result: Result<String, StepError> = run_handler(
            "step",
            || async { Ok::<_, BoxError>("something".to_string()) },
            &state,
        )
        .await;

        assert!(result.unwrap_err().is_interrupt());
        let guard = state.lock().await;
        let op = guard.next_op().unwrap();
        assert_eq!(op.op, StepOpCode::RunStep);
        assert_eq!(op.id, "step");
        assert_eq!(op.hash, RUN_STEP);
        assert_eq!(op.data, Some(json!("something")));
        assert!(op.error.is_none());
    }

    #[tokio::test]
    async fn test_failing_step_records_failure_marker() {
        let state = ExecutionState::empty().into_shared();

        let result: Result<u32, StepError> = run_handler(
            "step",
            || async { Err::<u32, BoxError>("card declined".into()) },
            &state,
        )
        .await;

        assert!(result.unwrap_err().is_interrupt());
        let guard = state.lock().await;
        let op = guard.next_op().unwrap();
        assert!(op.data.is_none());
        assert_eq!(op.error.as_ref().unwrap().message, "card declined");
    }

    #[tokio::test]
    async fn test_memoized_step_skips_function() {
        let state = replaying(StepResult::Data(json!({ "total": 3 })));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let value: serde_json::Value = run_handler(
            "step",
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(json!({ "total": 99 }))
            },
            &state,
        )
        .await
        .unwrap();

        assert_eq!(value, json!({ "total": 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!state.lock().await.has_next_op());
    }

    #[tokio::test]
    async fn test_memoized_failure_returns_step_failed() {
        let state = replaying(StepResult::Error(ErrorObject::new("Error", "card declined")));

        let result: Result<u32, StepError> =
            run_handler("step", || async { Ok::<u32, BoxError>(1) }, &state).await;

        match result.unwrap_err() {
            StepError::StepFailed { id, error } => {
                assert_eq!(id, "step");
                assert_eq!(error.message, "card declined");
            }
            other => panic!("Expected StepFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_id_is_definition_error() {
        let state = ExecutionState::empty().into_shared();

        let result: Result<u32, StepError> =
            run_handler("  ", || async { Ok::<u32, BoxError>(1) }, &state).await;

        assert!(result.unwrap_err().is_definition());
        let guard = state.lock().await;
        assert_eq!(guard.position(), 0);
        assert!(!guard.has_next_op());
    }

    #[tokio::test]
    async fn test_joined_steps_run_only_the_first() {
        let state = ExecutionState::empty().into_shared();
        let calls = Arc::new(AtomicUsize::new(0));

        let step = |label: &'static str, weight: usize| {
            let counter = calls.clone();
            let state = state.clone();
            async move {
                run_handler(
                    label,
                    move || async move {
                        tokio::task::yield_now().await;
                        counter.fetch_add(weight, Ordering::SeqCst);
                        Ok::<u32, BoxError>(1)
                    },
                    &state,
                )
                .await
            }
        };

        let (a, b) = tokio::join!(step("a", 1), step("b", 10));

        assert!(a.unwrap_err().is_interrupt());
        assert!(b.unwrap_err().is_interrupt());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let guard = state.lock().await;
        let op = guard.next_op().unwrap();
        assert_eq!(op.id, "a");
        assert_eq!(op.data, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_unserializable_value_releases_pending_slot() {
        struct Unserializable;

        impl Serialize for Unserializable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("not representable"))
            }
        }

        impl<'de> serde::Deserialize<'de> for Unserializable {
            fn deserialize<D: serde::Deserializer<'de>>(_: D) -> Result<Self, D::Error> {
                Ok(Unserializable)
            }
        }

        let state = ExecutionState::empty().into_shared();
        let result =
            run_handler("step", || async { Ok::<_, BoxError>(Unserializable) }, &state).await;

        assert!(matches!(result, Err(StepError::SerDes { .. })));
        let mut guard = state.lock().await;
        assert!(guard.take_next_op().is_none());
    }

    #[tokio::test]
    async fn test_step_after_interrupt_does_not_run() {
        let state = ExecutionState::empty().into_shared();
        let calls = Arc::new(AtomicUsize::new(0));

        for label in ["first", "second"] {
            let counter = calls.clone();
            let result: Result<u32, StepError> = run_handler(
                label,
                move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<u32, BoxError>(1)
                },
                &state,
            )
            .await;
            assert!(result.unwrap_err().is_interrupt());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.lock().await.next_op().unwrap().id, "first");
    }
}
