//! Operation types for the durable step SDK.
//!
//! This module defines the step op descriptor sent to the orchestrator and
//! the memoized results the orchestrator hands back on replay.

use serde::{Deserialize, Serialize};

use crate::error::ErrorObject;

/// The kind of step an op describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepOpCode {
    /// A `run` step wrapping user code
    #[serde(rename = "Step")]
    RunStep,
    /// A `sleep` or `sleep_until` step
    Sleep,
    /// A `wait_for_event` step
    WaitForEvent,
}

impl std::fmt::Display for StepOpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunStep => write!(f, "Step"),
            Self::Sleep => write!(f, "Sleep"),
            Self::WaitForEvent => write!(f, "WaitForEvent"),
        }
    }
}

/// Variant-specific op options.
///
/// Fields are declared in sorted key order and absent options are omitted,
/// so the serialized form is canonical and feeds the hasher directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpOpts {
    /// Event match expression for `WaitForEvent`
    #[serde(rename = "match", skip_serializing_if = "Option::is_none", default)]
    pub match_expr: Option<String>,

    /// Time-to-live token for `WaitForEvent`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub ttl: Option<String>,
}

impl OpOpts {
    /// Returns true when no option is set.
    pub fn is_empty(&self) -> bool {
        self.match_expr.is_none() && self.ttl.is_none()
    }
}

/// The canonical descriptor for one step.
///
/// `hash` is the durable correlation key between invocations. `data` and
/// `error` are only ever set on `RunStep` ops, once the step's function has
/// settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOp {
    /// The op code
    pub op: StepOpCode,

    /// Step label, duration token or event name
    pub id: String,

    /// Deterministic digest of op, id and opts
    pub hash: String,

    /// Variant-specific options
    #[serde(default)]
    pub opts: OpOpts,

    /// Position of the step tool call within the invocation
    #[serde(default)]
    pub pos: usize,

    /// The step's produced value. A present `null` is a settled unit value.
    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "deserialize_present"
    )]
    pub data: Option<serde_json::Value>,

    /// Failure marker if the step's function failed
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<ErrorObject>,
}

impl StepOp {
    /// Creates a new pending StepOp.
    pub fn new(
        op: StepOpCode,
        id: impl Into<String>,
        opts: OpOpts,
        hash: impl Into<String>,
        pos: usize,
    ) -> Self {
        Self {
            op,
            id: id.into(),
            hash: hash.into(),
            opts,
            pos,
            data: None,
            error: None,
        }
    }

    /// Sets the produced value.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the failure marker.
    pub fn with_error(mut self, error: ErrorObject) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns true if the step's function has settled (successfully or not).
    pub fn is_settled(&self) -> bool {
        self.data.is_some() || self.error.is_some()
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)`; a missing field still
/// falls back to `None` through `default`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

/// A previously resolved step result, supplied by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepResult {
    /// The step resolved with a value (`null` for sleeps and timed-out waits)
    Data(serde_json::Value),
    /// The step failed and will not be retried further
    Error(ErrorObject),
}

impl StepResult {
    /// Returns true if this is a failure marker.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns the resolved value, if any.
    pub fn data(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Returns the failure marker, if any.
    pub fn error(&self) -> Option<&ErrorObject> {
        match self {
            Self::Data(_) => None,
            Self::Error(error) => Some(error),
        }
    }
}

impl From<&StepOp> for StepResult {
    /// Converts a settled op into the result an orchestrator would persist.
    fn from(op: &StepOp) -> Self {
        match (&op.error, &op.data) {
            (Some(error), _) => Self::Error(error.clone()),
            (None, Some(data)) => Self::Data(data.clone()),
            (None, None) => Self::Data(serde_json::Value::Null),
        }
    }
}
