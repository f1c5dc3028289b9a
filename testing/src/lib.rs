//! Testing utilities for the durable step SDK.
//!
//! This crate runs step functions locally, standing in for the orchestrator
//! so a whole multi-invocation run can be exercised from a single test.
//!
//! # Features
//!
//! - **LocalRunner**: invoke a handler repeatedly, resolving each pending op
//! - **Event delivery**: queue events for `wait_for_event` steps
//! - **Step retries**: retry failed `run` steps with increasing attempts
//! - **TestResult**: inspect the outcome, every recorded op and every invocation
//!
//! # Example
//!
//! ```
//! use durable_step_sdk::{Context, StepError};
//! use durable_step_sdk_testing::{ExecutionStatus, LocalRunner};
//! use serde_json::json;
//!
//! async fn workflow(ctx: Context) -> Result<String, StepError> {
//!     let greeting: String = ctx
//!         .step
//!         .run("greet", || async { Ok("hello".to_string()) })
//!         .await?;
//!     ctx.step.sleep("1d").await?;
//!     Ok(greeting)
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut runner = LocalRunner::new(workflow);
//! let result = runner.run::<String>(json!({})).await.unwrap();
//!
//! assert_eq!(result.get_status(), ExecutionStatus::Succeeded);
//! assert_eq!(result.get_result().unwrap(), "hello");
//! assert_eq!(result.operation_count(), 2);
//! # });
//! ```

pub mod error;
pub mod local_runner;
pub mod test_result;
pub mod types;

pub use error::TestError;
pub use local_runner::{LocalRunner, DEFAULT_MAX_INVOCATIONS};
pub use test_result::TestResult;
pub use types::{ExecutionStatus, Invocation};

// Re-export key types from the SDK for convenience
pub use durable_step_sdk::{
    Context, ErrorObject, EventPayload, ExecutionConfig, FixedClock, InvocationStatus, StepError,
    StepOp, StepOpCode, StepResult,
};
