//! JSON conversion of step data.
//!
//! Step values cross the orchestrator boundary as JSON. These helpers turn a
//! step's produced value into the op's `data`, and a memoized payload back
//! into the type the handler asked for, naming the op in any failure.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::StepError;
use crate::operation::StepOp;

/// Serializes a step's produced value into op data.
pub fn to_step_data<T: Serialize>(value: &T, op: &StepOp) -> Result<serde_json::Value, StepError> {
    serde_json::to_value(value).map_err(|e| {
        StepError::serdes(format!(
            "Failed to serialize result of {} '{}': {}",
            op.op, op.id, e
        ))
    })
}

/// Deserializes a memoized payload into the handler's type.
pub fn from_step_data<T: DeserializeOwned>(
    data: &serde_json::Value,
    op: &StepOp,
) -> Result<T, StepError> {
    T::deserialize(data).map_err(|e| {
        StepError::serdes(format!(
            "Failed to deserialize memoized result of {} '{}' ({}): {}",
            op.op, op.id, op.hash, e
        ))
    })
}
