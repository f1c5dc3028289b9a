//! Configuration types for the durable step SDK.
//!
//! [`ClientOptions`] configures the event-sending [`Client`](crate::Client)
//! and can be resolved from the environment. [`ExecutionConfig`] configures
//! the invocation boundary.

use std::sync::Arc;

use crate::clock::{Clock, SharedClock, SystemClock};
use crate::error::StepError;

/// Environment variable holding the event key.
pub const EVENT_KEY_VAR: &str = "STEP_EVENT_KEY";

/// Environment variable overriding the orchestrator base URL.
pub const BASE_URL_VAR: &str = "STEP_BASE_URL";

/// Environment variable naming the target environment (branch) for events.
pub const ENV_VAR: &str = "STEP_ENV";

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://inn.gs/";

/// Options for an event-sending client.
///
/// # Example
///
/// ```rust
/// use durable_step_sdk::ClientOptions;
///
/// let options = ClientOptions::new("My App")
///     .unwrap()
///     .with_event_key("abc123");
/// assert_eq!(options.event_url().as_deref(), Some("https://inn.gs/e/abc123"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Application name
    pub name: String,
    /// Key used to send events
    pub event_key: Option<String>,
    /// Orchestrator base URL
    pub base_url: String,
    /// Target environment, sent with every request
    pub env: Option<String>,
}

impl ClientOptions {
    /// Creates options with the default base URL and no event key.
    ///
    /// Returns a Definition error if `name` is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, StepError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StepError::definition(
                "A name must be passed to create a client",
            ));
        }
        Ok(Self {
            name,
            event_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            env: None,
        })
    }

    /// Creates options for `name`, reading the event key, base URL and
    /// environment from the process environment.
    pub fn from_env(name: impl Into<String>) -> Result<Self, StepError> {
        Self::from_lookup(name, |key| std::env::var(key).ok())
    }

    /// Creates options for `name`, resolving variables with `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(name: impl Into<String>, lookup: F) -> Result<Self, StepError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut options = Self::new(name)?;
        options.event_key = var(EVENT_KEY_VAR);
        options.env = var(ENV_VAR);
        if let Some(base_url) = var(BASE_URL_VAR) {
            options.base_url = base_url;
        }
        Ok(options)
    }

    /// Sets the event key.
    pub fn with_event_key(mut self, event_key: impl Into<String>) -> Self {
        self.event_key = Some(event_key.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the target environment.
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Returns true if an event key is configured.
    pub fn has_event_key(&self) -> bool {
        self.event_key.is_some()
    }

    /// Returns the URL events are posted to, or `None` without an event key.
    pub fn event_url(&self) -> Option<String> {
        self.event_key
            .as_ref()
            .map(|key| format!("{}/e/{}", self.base_url.trim_end_matches('/'), key))
    }
}

/// Configuration for the invocation boundary.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Source of "now" for `sleep_until` and date timeouts
    pub clock: SharedClock,
}

impl ExecutionConfig {
    /// Creates a config using the system clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clock.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }
}
