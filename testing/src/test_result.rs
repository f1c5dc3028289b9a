//! Test result types for step function testing.
//!
//! This module provides the `TestResult` struct which holds the outcome of a
//! run and the ops recorded along the way.

use durable_step_sdk::{ErrorObject, StepOp, StepOpCode};

use crate::error::TestError;
use crate::types::{ExecutionStatus, Invocation};

/// Result of running a function under the local runner.
///
/// # Examples
///
/// ```ignore
/// let result: TestResult<String> = runner.run(json!({})).await?;
///
/// assert_eq!(result.get_status(), ExecutionStatus::Succeeded);
/// assert_eq!(result.get_result()?, "expected output");
/// assert_eq!(result.get_operations().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct TestResult<T> {
    status: ExecutionStatus,
    result: Option<T>,
    error: Option<ErrorObject>,
    operations: Vec<StepOp>,
    invocations: Vec<Invocation>,
}

impl<T> TestResult<T> {
    /// Creates a successful result.
    pub fn success(result: T, operations: Vec<StepOp>, invocations: Vec<Invocation>) -> Self {
        Self {
            status: ExecutionStatus::Succeeded,
            result: Some(result),
            error: None,
            operations,
            invocations,
        }
    }

    /// Creates a failed result.
    pub fn failure(
        error: ErrorObject,
        operations: Vec<StepOp>,
        invocations: Vec<Invocation>,
    ) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            result: None,
            error: Some(error),
            operations,
            invocations,
        }
    }

    /// Creates a result for a run stopped with a step still pending.
    pub fn running(operations: Vec<StepOp>, invocations: Vec<Invocation>) -> Self {
        Self {
            status: ExecutionStatus::Running,
            result: None,
            error: None,
            operations,
            invocations,
        }
    }

    /// Returns the run status.
    pub fn get_status(&self) -> ExecutionStatus {
        self.status
    }

    /// Returns the handler's result if the run succeeded.
    pub fn get_result(&self) -> Result<&T, TestError> {
        self.result
            .as_ref()
            .ok_or(TestError::ResultNotAvailable(self.status))
    }

    /// Returns the error if the run failed.
    pub fn get_error(&self) -> Option<&ErrorObject> {
        self.error.as_ref()
    }

    /// Returns every op recorded, in the order the orchestrator received them.
    ///
    /// Retried steps appear once per attempt.
    pub fn get_operations(&self) -> &[StepOp] {
        &self.operations
    }

    /// Returns the recorded ops with the given op code.
    pub fn get_operations_by_code(&self, code: StepOpCode) -> Vec<&StepOp> {
        self.operations.iter().filter(|op| op.op == code).collect()
    }

    /// Returns the first recorded op with the given id.
    pub fn get_operation(&self, id: &str) -> Option<&StepOp> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Returns every handler invocation.
    pub fn get_invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Returns true if the run succeeded.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the run failed.
    pub fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Returns true if the run stopped with a step pending.
    pub fn is_running(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Returns the number of recorded ops.
    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Returns the number of handler invocations.
    pub fn invocation_count(&self) -> usize {
        self.invocations.len()
    }
}
