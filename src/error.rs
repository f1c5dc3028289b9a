//! Error types for the durable step SDK.
//!
//! This module defines the error hierarchy used by step tools and the
//! invocation boundary, including the flow-control signal that suspends a
//! handler once a new step has been discovered.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::operation::{StepOp, StepOpCode};

/// The main error type for the durable step SDK.
///
/// Only [`StepError::Interrupt`] is expected during normal operation: it is the
/// signal that the handler found an unresolved step and must stop. Every other
/// variant is a genuine failure surfaced to the invocation boundary.
#[derive(Debug, Error)]
pub enum StepError {
    /// Flow-control signal: a new step op was recorded and the invocation must end.
    #[error("Step flow interrupted: {0}")]
    Interrupt(FlowInterrupt),

    /// Malformed step tool arguments, a programming error in the handler.
    #[error("Definition error: {message}")]
    Definition {
        /// Error message describing the invalid argument
        message: String,
    },

    /// A `run` step whose memoized result is a failure marker.
    #[error("Step '{id}' failed: {}", .error.message)]
    StepFailed {
        /// The step id as passed to `run`
        id: String,
        /// The recorded failure
        error: ErrorObject,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerDes {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Error raised by handler code outside of any step.
    #[error("Handler error: {message}")]
    Handler {
        /// Error message from the handler
        message: String,
        /// The type of error
        error_type: String,
    },
}

impl StepError {
    /// Creates a new Definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Creates a new SerDes error.
    pub fn serdes(message: impl Into<String>) -> Self {
        Self::SerDes {
            message: message.into(),
        }
    }

    /// Creates a new Handler error.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
            error_type: "Error".to_string(),
        }
    }

    /// Creates the interrupt signal for a recorded op.
    pub fn interrupt(op: &StepOp) -> Self {
        Self::Interrupt(FlowInterrupt::from(op))
    }

    /// Returns true if this is the flow-control interrupt.
    pub fn is_interrupt(&self) -> bool {
        matches!(self, Self::Interrupt(_))
    }

    /// Returns true if this is a Definition error.
    pub fn is_definition(&self) -> bool {
        matches!(self, Self::Definition { .. })
    }
}

/// Signal raised once a step tool has recorded the invocation's next op.
///
/// Carries enough of the op to identify it in logs; the op itself lives in
/// the execution state and is serialized by the invocation boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInterrupt {
    /// Op code of the pending step
    pub op: StepOpCode,
    /// Id of the pending step
    pub id: String,
    /// Hash of the pending step
    pub hash: String,
}

impl From<&StepOp> for FlowInterrupt {
    fn from(op: &StepOp) -> Self {
        Self {
            op: op.op,
            id: op.id.clone(),
            hash: op.hash.clone(),
        }
    }
}

impl fmt::Display for FlowInterrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.op, self.id, self.hash)
    }
}

/// Serializable failure marker recorded for failed steps and failed invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The error type/name
    pub name: String,
    /// The error message
    pub message: String,
    /// Optional stack trace or error source chain
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub stack: Option<String>,
}

impl ErrorObject {
    /// Creates a new ErrorObject.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// Sets the stack.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Captures a user error, recording its source chain as the stack.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut obj = Self::new("Error", error.to_string());
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {}", cause));
            source = cause.source();
        }
        if !chain.is_empty() {
            obj.stack = Some(chain.join("\n"));
        }
        obj
    }
}

impl From<&StepError> for ErrorObject {
    fn from(error: &StepError) -> Self {
        match error {
            StepError::Interrupt(interrupt) => {
                ErrorObject::new("StepFlowInterrupt", interrupt.to_string())
            }
            StepError::Definition { message } => ErrorObject::new("DefinitionError", message),
            StepError::StepFailed { error, .. } => error.clone(),
            StepError::SerDes { message } => ErrorObject::new("SerDesError", message),
            StepError::Handler {
                message,
                error_type,
            } => ErrorObject::new(error_type, message),
        }
    }
}

impl From<serde_json::Error> for StepError {
    fn from(error: serde_json::Error) -> Self {
        Self::SerDes {
            message: error.to_string(),
        }
    }
}

impl From<std::io::Error> for StepError {
    fn from(error: std::io::Error) -> Self {
        Self::Handler {
            message: error.to_string(),
            error_type: "IoError".to_string(),
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for StepError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Handler {
            message: error.to_string(),
            error_type: "Error".to_string(),
        }
    }
}
