//! The handler context and step tools.
//!
//! A handler receives a [`Context`] on every invocation. Its [`StepTools`]
//! are the only way to declare steps; each call either resolves from the
//! memoized results or records the invocation's next op and returns the
//! interrupt signal, which the handler propagates with `?`.
//!
//! # Example
//!
//! ```rust
//! use durable_step_sdk::{Context, StepError};
//!
//! async fn handler(ctx: Context) -> Result<String, StepError> {
//!     let user: String = ctx
//!         .step
//!         .run("load-user", || async { Ok("ada".to_string()) })
//!         .await?;
//!
//!     ctx.step.sleep("1h").await?;
//!
//!     Ok(format!("welcomed {}", user))
//! }
//! ```

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::clock::SharedClock;
use crate::duration::TimeStr;
use crate::error::StepError;
use crate::handlers::{
    run_handler, sleep_handler, sleep_until_handler, wait_for_event_handler, WaitForEventOpts,
};
use crate::operation::StepOp;
use crate::state::SharedExecutionState;

/// Boxed error returned by step functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The step tools available to a handler during one invocation.
///
/// Cloning is cheap; clones share the same execution state.
#[derive(Debug, Clone)]
pub struct StepTools {
    state: SharedExecutionState,
    clock: SharedClock,
}

impl StepTools {
    /// Creates step tools over the given state, resolving "now" with `clock`.
    pub fn new(state: SharedExecutionState, clock: SharedClock) -> Self {
        Self { state, clock }
    }

    /// Runs `func` as a step named `id`.
    ///
    /// On replay the memoized value is returned without calling `func`.
    /// Otherwise `func` runs, its outcome is recorded and the interrupt
    /// signal is returned; the value is only observed on a later replay.
    pub async fn run<T, F, Fut>(&self, id: &str, func: F) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, BoxError>> + Send,
    {
        run_handler(id, func, &self.state).await
    }

    /// Like [`run`](Self::run) for a synchronous step function.
    pub async fn run_sync<T, F>(&self, id: &str, func: F) -> Result<T, StepError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Result<T, BoxError> + Send,
    {
        run_handler(id, move || std::future::ready(func()), &self.state).await
    }

    /// Sleeps for a duration token such as `"1m"`, or a [`Duration`](crate::Duration).
    pub async fn sleep(&self, duration: impl Into<TimeStr>) -> Result<(), StepError> {
        sleep_handler(duration.into(), &self.state).await
    }

    /// Sleeps until an absolute instant.
    pub async fn sleep_until(&self, until: DateTime<Utc>) -> Result<(), StepError> {
        sleep_until_handler(until, self.clock.now(), &self.state).await
    }

    /// Waits for an event named `event`.
    ///
    /// Resolves to `Some(event)` when a matching event arrived, or `None`
    /// when the timeout passed first.
    pub async fn wait_for_event<T>(
        &self,
        event: &str,
        opts: Option<WaitForEventOpts>,
    ) -> Result<Option<T>, StepError>
    where
        T: DeserializeOwned,
    {
        let opts = opts.unwrap_or_default();
        wait_for_event_handler(event, &opts, self.clock.now(), &self.state).await
    }

    /// Returns the next op recorded this invocation, if any.
    pub async fn next_op(&self) -> Option<StepOp> {
        self.state.lock().await.next_op().cloned()
    }

    /// Returns the shared execution state.
    pub fn state(&self) -> &SharedExecutionState {
        &self.state
    }
}

/// The context passed to a handler on each invocation.
#[derive(Debug, Clone)]
pub struct Context {
    /// The event that triggered the function run
    pub event: serde_json::Value,
    /// Orchestrator run id, if supplied
    pub run_id: Option<String>,
    /// Retry attempt of the current step, 0-indexed
    pub attempt: u32,
    /// Step tools for this invocation
    pub step: StepTools,
}

impl Context {
    /// Deserializes the triggering event.
    pub fn event<E: DeserializeOwned>(&self) -> Result<E, StepError> {
        E::deserialize(&self.event)
            .map_err(|e| StepError::serdes(format!("Failed to deserialize event: {}", e)))
    }
}

/// Creates a tracing span for a step op.
///
/// The span carries `op`, `id`, `hash` and `pos`; `status` is recorded by
/// the handler once the op settles or suspends.
pub fn create_step_span(op: &StepOp) -> tracing::Span {
    tracing::debug_span!(
        "step",
        op = %op.op,
        id = %op.id,
        hash = %op.hash,
        pos = op.pos,
        status = tracing::field::Empty,
    )
}
