//! Error types for the testing utilities crate.

use thiserror::Error;

use crate::types::ExecutionStatus;

/// Errors that can occur during testing.
///
/// # Examples
///
/// ```
/// use durable_step_sdk_testing::{ExecutionStatus, TestError};
///
/// let err = TestError::ResultNotAvailable(ExecutionStatus::Running);
/// assert!(err.to_string().contains("Running"));
/// ```
#[derive(Debug, Error)]
pub enum TestError {
    /// The requested result does not exist for this status.
    #[error("Result not available: execution is {0}")]
    ResultNotAvailable(ExecutionStatus),

    /// The handler's result did not deserialize into the requested type.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The queued event could not be converted into step data.
    #[error("Invalid event '{name}': {message}")]
    InvalidEvent {
        /// Event name
        name: String,
        /// Error message
        message: String,
    },
}
