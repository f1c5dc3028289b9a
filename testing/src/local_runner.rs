//! Local test runner for step functions.
//!
//! [`LocalRunner`] plays the orchestrator in-process: it invokes the handler,
//! resolves each pending op the way the orchestrator would, and re-invokes
//! with the accumulated results until the handler completes or fails.
//!
//! Pending ops are resolved as follows:
//!
//! - `Step`: the data recorded on the op; a failed step is retried with an
//!   incremented attempt until the retry limit is reached, then recorded as a
//!   failure marker
//! - `Sleep`: resolved immediately with `null`, no real time passes
//! - `WaitForEvent`: the first event queued with [`LocalRunner::send_event`]
//!   that carries the awaited name and satisfies the match expression, or
//!   `null` (a timeout) if none does
//!
//! # Example
//!
//! ```ignore
//! use durable_step_sdk_testing::{ExecutionStatus, LocalRunner};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let mut runner = LocalRunner::new(my_workflow);
//!     let result = runner.run::<String>(json!({ "data": {} })).await.unwrap();
//!
//!     assert_eq!(result.get_status(), ExecutionStatus::Succeeded);
//! }
//! ```

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use durable_step_sdk::{
    run_invocation, ErrorObject, EventPayload, ExecutionConfig, InvocationContext,
    InvocationInput, InvocationStatus, StepHandler, StepOp, StepOpCode, StepResult,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;
use crate::test_result::TestResult;
use crate::types::Invocation;

/// Default cap on handler invocations per run.
pub const DEFAULT_MAX_INVOCATIONS: usize = 100;

const DEFAULT_RUN_ID: &str = "local-run";

/// Runs a step function to completion in-process.
pub struct LocalRunner<H> {
    handler: H,
    config: ExecutionConfig,
    run_id: String,
    max_invocations: usize,
    step_retries: u32,
    events: HashMap<String, VecDeque<EventPayload>>,
}

impl<H> LocalRunner<H> {
    /// Queues an event for delivery to a `wait_for_event` step.
    ///
    /// Events are consumed on delivery, in the order they were queued.
    pub fn send_event(&mut self, event: EventPayload) {
        tracing::debug!(name = %event.name, "Queued event");
        self.events
            .entry(event.name.clone())
            .or_default()
            .push_back(event);
    }

    /// Returns the number of queued events not yet delivered.
    pub fn queued_event_count(&self) -> usize {
        self.events.values().map(VecDeque::len).sum()
    }
}

impl<H> LocalRunner<H>
where
    H: StepHandler,
{
    /// Creates a runner for `handler` with the system clock and no retries.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            config: ExecutionConfig::default(),
            run_id: DEFAULT_RUN_ID.to_string(),
            max_invocations: DEFAULT_MAX_INVOCATIONS,
            step_retries: 0,
            events: HashMap::new(),
        }
    }

    /// Sets the execution config, typically to pin the clock.
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the run id passed to the handler.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Sets the cap on handler invocations per run.
    pub fn with_max_invocations(mut self, max_invocations: usize) -> Self {
        self.max_invocations = max_invocations;
        self
    }

    /// Sets how many times a failed `run` step is retried before it is
    /// recorded as failed.
    pub fn with_step_retries(mut self, step_retries: u32) -> Self {
        self.step_retries = step_retries;
        self
    }

    /// Runs the handler for `event` until it completes, fails, or reaches
    /// the invocation cap.
    ///
    /// The handler's return value is deserialized into `O`.
    pub async fn run<O>(&mut self, event: Value) -> Result<TestResult<O>, TestError>
    where
        O: DeserializeOwned,
    {
        let mut steps: HashMap<String, StepResult> = HashMap::new();
        let mut operations: Vec<StepOp> = Vec::new();
        let mut invocations: Vec<Invocation> = Vec::new();
        let mut attempt = 0;

        for _ in 0..self.max_invocations {
            let input = InvocationInput {
                event: event.clone(),
                steps: steps.clone(),
                ctx: InvocationContext {
                    run_id: Some(self.run_id.clone()),
                    attempt,
                },
            };

            let start_timestamp = Utc::now();
            let output = run_invocation(&self.handler, input, &self.config).await;
            invocations.push(Invocation {
                start_timestamp,
                end_timestamp: Utc::now(),
                status: output.status,
                op: output.op.clone(),
                attempt,
            });

            match output.status {
                InvocationStatus::Completed => {
                    let result = serde_json::from_value(output.result.unwrap_or(Value::Null))?;
                    tracing::debug!(invocations = invocations.len(), "Run succeeded");
                    return Ok(TestResult::success(result, operations, invocations));
                }
                InvocationStatus::Failed => {
                    let error = output
                        .error
                        .unwrap_or_else(|| ErrorObject::new("Error", "Handler failed"));
                    tracing::debug!(error = %error.message, "Run failed");
                    return Ok(TestResult::failure(error, operations, invocations));
                }
                InvocationStatus::Pending => {
                    let Some(op) = output.op else {
                        tracing::warn!("Pending invocation reported no op; stopping run");
                        break;
                    };
                    operations.push(op.clone());
                    match self.resolve(&op, &event, &mut attempt)? {
                        Some(result) => {
                            steps.insert(op.hash, result);
                        }
                        None => {
                            tracing::debug!(id = %op.id, attempt = attempt, "Retrying step");
                        }
                    }
                }
            }
        }

        tracing::debug!(
            invocations = invocations.len(),
            "Invocation cap reached with a step still pending"
        );
        Ok(TestResult::running(operations, invocations))
    }

    /// Resolves a pending op, or returns `None` if a failed step should be
    /// retried.
    fn resolve(
        &mut self,
        op: &StepOp,
        trigger: &Value,
        attempt: &mut u32,
    ) -> Result<Option<StepResult>, TestError> {
        match op.op {
            StepOpCode::RunStep => match &op.error {
                Some(error) if *attempt < self.step_retries => {
                    tracing::debug!(id = %op.id, error = %error.message, "Step failed");
                    *attempt += 1;
                    Ok(None)
                }
                Some(error) => {
                    *attempt = 0;
                    Ok(Some(StepResult::Error(error.clone())))
                }
                None => {
                    *attempt = 0;
                    Ok(Some(StepResult::Data(
                        op.data.clone().unwrap_or(Value::Null),
                    )))
                }
            },
            StepOpCode::Sleep => Ok(Some(StepResult::Data(Value::Null))),
            StepOpCode::WaitForEvent => {
                let delivered = self.take_event(&op.id, op.opts.match_expr.as_deref(), trigger);
                let data = match delivered {
                    Some(event) => {
                        tracing::debug!(name = %event.name, "Delivering event");
                        serde_json::to_value(&event).map_err(|e| TestError::InvalidEvent {
                            name: event.name.clone(),
                            message: e.to_string(),
                        })?
                    }
                    None => {
                        tracing::debug!(name = %op.id, "No matching event queued; timing out");
                        Value::Null
                    }
                };
                Ok(Some(StepResult::Data(data)))
            }
        }
    }

    fn take_event(
        &mut self,
        name: &str,
        match_expr: Option<&str>,
        trigger: &Value,
    ) -> Option<EventPayload> {
        let queue = self.events.get_mut(name)?;
        let index = queue.iter().position(|candidate| {
            match_expr.map_or(true, |expr| expression_matches(expr, trigger, candidate))
        })?;
        queue.remove(index)
    }
}

impl<H> std::fmt::Debug for LocalRunner<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRunner")
            .field("run_id", &self.run_id)
            .field("max_invocations", &self.max_invocations)
            .field("step_retries", &self.step_retries)
            .field("queued_events", &self.queued_event_count())
            .finish_non_exhaustive()
    }
}

/// Evaluates a single `left == right` comparison against the triggering
/// event (`event.*`) and a candidate event (`async.*`).
///
/// Operands must be plain paths or scalar literals. Any other expression is
/// accepted unevaluated, so it matches every event with the awaited name.
fn expression_matches(expr: &str, trigger: &Value, candidate: &EventPayload) -> bool {
    let comparison = match expr.split(" == ").collect::<Vec<_>>().as_slice() {
        [left, right] => Operand::parse(left.trim()).zip(Operand::parse(right.trim())),
        _ => None,
    };
    let Some((left, right)) = comparison else {
        tracing::debug!(expr = expr, "Match expression not evaluated locally");
        return true;
    };
    let Ok(candidate) = serde_json::to_value(candidate) else {
        return false;
    };
    match (
        left.resolve(trigger, &candidate),
        right.resolve(trigger, &candidate),
    ) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// One side of a locally evaluated comparison.
#[derive(Debug, PartialEq)]
enum Operand<'a> {
    Trigger(&'a str),
    Candidate(&'a str),
    Literal(Value),
}

impl<'a> Operand<'a> {
    fn parse(token: &'a str) -> Option<Self> {
        if let Some(path) = token.strip_prefix("event.") {
            return is_path(path).then_some(Self::Trigger(path));
        }
        if let Some(path) = token.strip_prefix("async.") {
            return is_path(path).then_some(Self::Candidate(path));
        }
        if let Some(quoted) = token.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')) {
            return unquote(quoted).map(|s| Self::Literal(Value::String(s)));
        }
        match serde_json::from_str(token).ok()? {
            Value::Array(_) | Value::Object(_) => None,
            scalar => Some(Self::Literal(scalar)),
        }
    }

    fn resolve(self, trigger: &Value, candidate: &Value) -> Option<Value> {
        match self {
            Self::Trigger(path) => lookup(trigger, path),
            Self::Candidate(path) => lookup(candidate, path),
            Self::Literal(value) => Some(value),
        }
    }
}

fn is_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|key| {
            !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Reverses the backslash escaping of a single-quoted literal. Returns
/// `None` if the body holds a bare quote or a dangling backslash.
fn unquote(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '\'' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

fn lookup(value: &Value, path: &str) -> Option<Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .cloned()
}
