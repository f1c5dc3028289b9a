//! # Durable Step SDK
//!
//! This SDK lets Rust developers write step functions: handlers whose work is
//! split into discrete steps that are retried and resumed independently by a
//! remote orchestrator.
//!
//! ## Overview
//!
//! The orchestrator invokes a function once per step. Every invocation runs
//! the handler from the top with all results recorded so far. Steps that
//! already have a result return it immediately; the first step without one
//! is recorded as the invocation's *next op*, and the handler is interrupted
//! so the orchestrator can schedule it.
//!
//! ### Key Features
//!
//! - **Memoized steps**: completed steps return their recorded result and
//!   are never re-executed.
//! - **Deterministic op hashing**: each step is identified by a SHA-1 digest
//!   of its op code, id and options, stable across processes and platforms.
//! - **Sleeps and event waits**: pause for a duration, until an instant, or
//!   until a matching event arrives.
//! - **Interrupt as a value**: suspension is an ordinary error variant
//!   propagated with `?`, no unwinding involved.
//!
//! ## Important Documentation
//!
//! - [`docs::determinism`]: what a handler must keep stable between invocations
//!
//! ## Getting Started
//!
//! ```toml
//! [dependencies]
//! durable-step-sdk = "0.1"
//! tokio = { version = "1.0", features = ["full"] }
//! serde = { version = "1.0", features = ["derive"] }
//! ```
//!
//! ### Basic Example
//!
//! ```rust
//! use durable_step_sdk::{Context, StepError, WaitForEventOpts};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Signup {
//!     email: String,
//! }
//!
//! async fn onboarding(ctx: Context) -> Result<String, StepError> {
//!     let signup: Signup = ctx.event()?;
//!
//!     // Runs once; later invocations get the memoized value
//!     let account_id: String = ctx
//!         .step
//!         .run("create-account", || async { Ok("acct_123".to_string()) })
//!         .await?;
//!
//!     // Suspends the run for a day
//!     ctx.step.sleep("1d").await?;
//!
//!     // Waits up to a week for a matching event
//!     let activated: Option<serde_json::Value> = ctx
//!         .step
//!         .wait_for_event(
//!             "app/account.activated",
//!             Some(WaitForEventOpts::new().with_match("data.account_id").with_timeout("7d")),
//!         )
//!         .await?;
//!
//!     Ok(match activated {
//!         Some(_) => format!("{} activated {}", signup.email, account_id),
//!         None => format!("{} never activated", signup.email),
//!     })
//! }
//! ```
//!
//! ### Running an Invocation
//!
//! ```rust
//! use durable_step_sdk::{run_invocation, Context, ExecutionConfig, InvocationInput, StepError};
//! use serde_json::json;
//!
//! async fn handler(ctx: Context) -> Result<(), StepError> {
//!     ctx.step.sleep("1m").await?;
//!     Ok(())
//! }
//!
//! # tokio_test_block_on(async {
//! let output = run_invocation(&handler, InvocationInput::new(json!({})), &ExecutionConfig::default()).await;
//! assert!(output.is_pending());
//! assert_eq!(output.op.unwrap().id, "1m");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Step Tools
//!
//! [`StepTools`], available as `ctx.step`, is the only way to declare steps:
//!
//! - [`run`](StepTools::run): execute and memoize a unit of work
//! - [`sleep`](StepTools::sleep): pause for a duration token such as `"1m"`
//! - [`sleep_until`](StepTools::sleep_until): pause until an instant
//! - [`wait_for_event`](StepTools::wait_for_event): pause until an event matches, or a timeout passes
//!
//! ### The Interrupt
//!
//! When a step tool reaches a step without a recorded result it returns
//! `Err(StepError::Interrupt(_))`. Propagate it with `?`. The invocation
//! boundary reports the recorded op as `pending`; if the handler swallows the
//! interrupt the op is still reported.
//!
//! ### Step Failures
//!
//! A `run` step whose function fails does not fail the invocation. The
//! failure is recorded on the op for the orchestrator to retry. Once the
//! orchestrator gives up, replays return [`StepError::StepFailed`].
//!
//! ## Module Organization
//!
//! - [`client`]: event client and transport trait
//! - [`clock`]: source of "now"
//! - [`config`]: client options and execution config
//! - [`context`]: handler context and step tools
//! - [`docs`]: documentation modules
//! - [`duration`]: duration tokens
//! - [`error`]: error types
//! - [`function`]: function definitions
//! - [`handlers`]: step tool handlers
//! - [`hash`]: op hashing
//! - [`invocation`]: the invocation boundary
//! - [`matching`]: event match expressions
//! - [`operation`]: op and result types
//! - [`serdes`]: step data conversion
//! - [`state`]: per-invocation execution state

pub mod client;
pub mod clock;
pub mod config;
pub mod context;
pub mod docs;
pub mod duration;
pub mod error;
pub mod function;
pub mod handlers;
pub mod hash;
pub mod invocation;
pub mod matching;
pub mod operation;
pub mod serdes;
pub mod state;

// Re-export main types at crate root
pub use client::{
    ApiError, Client, ClientError, EventPayload, EventRequest, EventResponse, EventSender,
    SharedEventSender,
};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use config::{ClientOptions, ExecutionConfig};
pub use context::{create_step_span, BoxError, Context, StepTools};
pub use duration::{Duration, TimeStr, Timeout};
pub use error::{ErrorObject, FlowInterrupt, StepError};
pub use function::{FunctionTrigger, StepFunction};
pub use handlers::WaitForEventOpts;
pub use hash::{hash_op, OpIdentity};
pub use invocation::{
    run_invocation, InvocationContext, InvocationInput, InvocationOutput, InvocationStatus,
    StepHandler,
};
pub use matching::{MatchOn, MatchValue};
pub use operation::{OpOpts, StepOp, StepOpCode, StepResult};
pub use state::{ExecutionState, PlannedOp, ReplayStatus, SharedExecutionState};
