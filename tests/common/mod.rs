//! Shared test utilities for integration tests.

#![allow(dead_code)] // Not every test file uses every helper

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use durable_step_sdk::{
    ExecutionConfig, FixedClock, InvocationInput, InvocationOutput, StepOp, StepResult,
};
use serde_json::{json, Value};
use tracing::field::Visit;
use tracing::span::Attributes;
use tracing::Subscriber;

pub const SLEEP_1M: &str = "e1a749f7c36626655a79b0f337f7d0fa06efdd38";
pub const SLEEP_1M_REPEAT: &str = "2117a10ee6aea6375fda330b9af77da2a1ef38c7";
pub const RUN_STEP: &str = "5509b491cbbcbe4fac8d3d7f3ced607579178f60";
pub const RUN_STEP_REPEAT: &str = "1ddfac52e5758881bc93a9d1a3f577129b9c8674";
pub const WAIT_EVENT: &str = "f502ede21ad045e90a78c6c55e3feb235cd034f3";
pub const WAIT_EVENT_TTL_1M: &str = "5e3976075e62219112ab405dcc9d05dbbf235023";

/// 2024-01-01T00:00:00Z
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// An execution config whose clock is frozen at `now`.
pub fn config_at(now: DateTime<Utc>) -> ExecutionConfig {
    ExecutionConfig::new().with_clock(FixedClock(now))
}

/// An input carrying `event` and the given resolved steps.
pub fn input_with(event: Value, steps: &[(&str, StepResult)]) -> InvocationInput {
    steps
        .iter()
        .fold(InvocationInput::new(event), |input, (hash, result)| {
            input.with_step(*hash, result.clone())
        })
}

/// A resolved step carrying `null`.
pub fn null_step() -> StepResult {
    StepResult::Data(Value::Null)
}

/// Returns the pending op of `output`, panicking if there is none.
pub fn pending_op(output: &InvocationOutput) -> &StepOp {
    assert!(output.is_pending(), "expected pending, got {:?}", output);
    output.op.as_ref().unwrap()
}

/// Resolves a pending op the way the orchestrator does on success.
pub fn resolve(op: &StepOp) -> (String, StepResult) {
    let data = op.data.clone().unwrap_or_else(|| json!(null));
    (op.hash.clone(), StepResult::Data(data))
}

/// Captures the fields of every span created while installed.
#[derive(Debug, Default)]
pub struct FieldCapture {
    pub fields: HashMap<String, String>,
}

impl Visit for FieldCapture {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{:?}", value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .insert(field.name().to_string(), value.to_string());
    }
}

/// Span name to the fields it was created with.
pub type CapturedSpans = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

/// A layer recording each new span's name and attributes.
pub struct TestLayer {
    pub spans: CapturedSpans,
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for TestLayer {
    fn on_new_span(
        &self,
        attrs: &Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut capture = FieldCapture::default();
        attrs.record(&mut capture);
        self.spans
            .lock()
            .unwrap()
            .push((attrs.metadata().name().to_string(), capture.fields));
    }
}
