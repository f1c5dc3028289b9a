//! The invocation boundary.
//!
//! The orchestrator calls a function once per step. Each call carries the
//! triggering event and every step result recorded so far. The boundary
//! builds a fresh [`ExecutionState`] from those results, runs the handler
//! from the top, and reports one of three outcomes:
//!
//! - `pending`: the handler reached a new step; the op is returned so the
//!   orchestrator can schedule it
//! - `completed`: the handler returned without reaching a new step
//! - `failed`: the handler returned an error other than the interrupt

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::ExecutionConfig;
use crate::context::{Context, StepTools};
use crate::error::{ErrorObject, StepError};
use crate::operation::{StepOp, StepResult};
use crate::state::ExecutionState;

/// Input payload for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationInput {
    /// The event that triggered the function run
    #[serde(default)]
    pub event: serde_json::Value,

    /// Previously resolved step results keyed by op hash
    #[serde(default)]
    pub steps: HashMap<String, StepResult>,

    /// Run metadata
    #[serde(default)]
    pub ctx: InvocationContext,
}

impl InvocationInput {
    /// Creates an input for `event` with no resolved steps.
    pub fn new(event: serde_json::Value) -> Self {
        Self {
            event,
            ..Default::default()
        }
    }

    /// Adds a resolved step result.
    pub fn with_step(mut self, hash: impl Into<String>, result: StepResult) -> Self {
        self.steps.insert(hash.into(), result);
        self
    }

    /// Sets the run id.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.ctx.run_id = Some(run_id.into());
        self
    }

    /// Sets the attempt number.
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.ctx.attempt = attempt;
        self
    }
}

/// Run metadata supplied with an invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationContext {
    /// Orchestrator run id
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub run_id: Option<String>,

    /// Retry attempt of the current step, 0-indexed
    #[serde(default)]
    pub attempt: u32,
}

/// Status of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationStatus {
    /// A new step was found and must be scheduled
    Pending,
    /// The handler returned a value
    Completed,
    /// The handler failed
    Failed,
}

impl InvocationStatus {
    /// Returns the HTTP status code reported for this status.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Pending => 206,
            Self::Completed => 200,
            Self::Failed => 500,
        }
    }
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Output payload for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutput {
    /// The outcome
    pub status: InvocationStatus,

    /// The next op, when pending
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub op: Option<StepOp>,

    /// The handler's return value, when completed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub result: Option<serde_json::Value>,

    /// Error details, when failed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorObject>,
}

impl InvocationOutput {
    /// Creates an output reporting a new step.
    pub fn pending(op: StepOp) -> Self {
        Self {
            status: InvocationStatus::Pending,
            op: Some(op),
            result: None,
            error: None,
        }
    }

    /// Creates an output reporting completion.
    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            status: InvocationStatus::Completed,
            op: None,
            result: Some(result),
            error: None,
        }
    }

    /// Creates an output reporting failure.
    pub fn failed(error: ErrorObject) -> Self {
        Self {
            status: InvocationStatus::Failed,
            op: None,
            result: None,
            error: Some(error),
        }
    }

    /// Creates an output from a serializable handler result.
    pub fn from_result<T: Serialize>(result: &T) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self::completed(value),
            Err(e) => Self::failed(ErrorObject::new(
                "SerDesError",
                format!("Failed to serialize result: {}", e),
            )),
        }
    }

    /// Returns true if the invocation is pending.
    pub fn is_pending(&self) -> bool {
        matches!(self.status, InvocationStatus::Pending)
    }

    /// Returns true if the invocation completed.
    pub fn is_completed(&self) -> bool {
        matches!(self.status, InvocationStatus::Completed)
    }

    /// Returns true if the invocation failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.status, InvocationStatus::Failed)
    }

    /// Returns the HTTP status code for this output.
    pub fn status_code(&self) -> u16 {
        self.status.status_code()
    }

    /// Serializes this output as the response body.
    pub fn body(&self) -> Result<String, StepError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A step function handler.
///
/// Implemented for any `Fn(Context) -> impl Future<Output = Result<T, StepError>>`,
/// so plain async functions can be used directly.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// The handler's return value
    type Output: Serialize + Send;

    /// Runs the handler once.
    async fn handle(&self, ctx: Context) -> Result<Self::Output, StepError>;
}

#[async_trait]
impl<F, Fut, O> StepHandler for F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, StepError>> + Send,
    O: Serialize + Send,
{
    type Output = O;

    async fn handle(&self, ctx: Context) -> Result<O, StepError> {
        (self)(ctx).await
    }
}

/// Runs one invocation of `handler`.
///
/// The handler runs inside an `invocation` span carrying the run id and
/// attempt. A next op recorded during the run always yields a pending
/// output, even if the handler swallowed the interrupt.
pub async fn run_invocation<H>(
    handler: &H,
    input: InvocationInput,
    config: &ExecutionConfig,
) -> InvocationOutput
where
    H: StepHandler + ?Sized,
{
    let span = tracing::info_span!(
        "invocation",
        run_id = input.ctx.run_id.as_deref().unwrap_or_default(),
        attempt = input.ctx.attempt,
    );
    execute(handler, input, config).instrument(span).await
}

async fn execute<H>(
    handler: &H,
    input: InvocationInput,
    config: &ExecutionConfig,
) -> InvocationOutput
where
    H: StepHandler + ?Sized,
{
    let state = ExecutionState::new(input.steps).into_shared();
    let ctx = Context {
        event: input.event,
        run_id: input.ctx.run_id,
        attempt: input.ctx.attempt,
        step: StepTools::new(state.clone(), config.clock.clone()),
    };

    tracing::debug!(memoized = state.lock().await.memoized_count(), "Starting invocation");
    let outcome = handler.handle(ctx).await;

    let mut guard = state.lock().await;
    let replayed = guard.replayed_count();
    let next_op = guard.take_next_op();
    drop(guard);

    match (outcome, next_op) {
        (Err(error), Some(op)) if error.is_interrupt() => {
            tracing::debug!(op = %op.op, id = %op.id, hash = %op.hash, replayed = replayed, "Invocation suspended");
            InvocationOutput::pending(op)
        }
        (outcome, Some(op)) => {
            tracing::warn!(
                op = %op.op,
                id = %op.id,
                hash = %op.hash,
                handler_failed = outcome.is_err(),
                "Handler did not propagate the step interrupt; reporting the pending op"
            );
            InvocationOutput::pending(op)
        }
        (Ok(value), None) => {
            tracing::debug!(replayed = replayed, "Invocation completed");
            InvocationOutput::from_result(&value)
        }
        (Err(error), None) => {
            tracing::debug!(error = %error, "Invocation failed");
            InvocationOutput::failed(ErrorObject::from(&error))
        }
    }
}
