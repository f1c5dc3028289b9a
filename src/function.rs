//! Step function definitions.
//!
//! A [`StepFunction`] pairs a handler with the trigger that starts new runs
//! and the configuration its invocations run under.

use serde::{Deserialize, Serialize};

use crate::config::ExecutionConfig;
use crate::error::StepError;
use crate::invocation::{run_invocation, InvocationInput, InvocationOutput, StepHandler};

/// What starts a new run of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionTrigger {
    /// Runs when an event with this name is received
    Event(String),
    /// Runs on a cron schedule
    Cron(String),
}

impl FunctionTrigger {
    /// Creates an event trigger.
    pub fn event(name: impl Into<String>) -> Self {
        Self::Event(name.into())
    }

    /// Creates a cron trigger.
    pub fn cron(expr: impl Into<String>) -> Self {
        Self::Cron(expr.into())
    }
}

/// A named handler with its trigger.
///
/// # Example
///
/// ```rust
/// use durable_step_sdk::{Context, FunctionTrigger, StepError, StepFunction};
///
/// async fn handler(ctx: Context) -> Result<(), StepError> {
///     ctx.step.sleep("1m").await?;
///     Ok(())
/// }
///
/// let function = StepFunction::new(
///     "Send Welcome Email",
///     FunctionTrigger::event("app/user.created"),
///     handler,
/// )
/// .unwrap();
/// assert_eq!(function.slug(), "send-welcome-email");
/// ```
pub struct StepFunction<H> {
    name: String,
    trigger: FunctionTrigger,
    handler: H,
    config: ExecutionConfig,
}

impl<H> std::fmt::Debug for StepFunction<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepFunction")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<H: StepHandler> StepFunction<H> {
    /// Creates a function.
    ///
    /// Returns a Definition error if the name or trigger is empty.
    pub fn new(
        name: impl Into<String>,
        trigger: FunctionTrigger,
        handler: H,
    ) -> Result<Self, StepError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StepError::definition("Function name must not be empty"));
        }
        let target = match &trigger {
            FunctionTrigger::Event(event) => event,
            FunctionTrigger::Cron(expr) => expr,
        };
        if target.trim().is_empty() {
            return Err(StepError::definition(format!(
                "Trigger for function '{}' must not be empty",
                name
            )));
        }
        Ok(Self {
            name,
            trigger,
            handler,
            config: ExecutionConfig::default(),
        })
    }

    /// Sets the execution config.
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the function name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the trigger.
    pub fn trigger(&self) -> &FunctionTrigger {
        &self.trigger
    }

    /// Returns the function id derived from its name.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Runs one invocation of the handler.
    pub async fn invoke(&self, input: InvocationInput) -> InvocationOutput {
        tracing::debug!(function = %self.slug(), "Invoking function");
        run_invocation(&self.handler, input, &self.config).await
    }
}

/// Lowercases `name` and joins its alphanumeric runs with `-`.
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
