//! # Determinism in Step Functions
//!
//! A handler is re-run from the top on every invocation, and each step tool
//! call is matched to its recorded result by the hash of its op code, id and
//! options. A handler therefore has to ask for the same steps, in the same
//! order, with the same arguments, on every invocation of a run.
//!
//! ## Keep stable
//!
//! - Step ids passed to `run`, and event names passed to `wait_for_event`
//! - Duration tokens passed to `sleep` (`"1m"`, not a value computed from the clock)
//! - Match fields, literals and `if` expressions
//! - The order of step tool calls
//!
//! ## Move into a step
//!
//! Anything that can differ between invocations belongs inside `run`, where
//! it executes once and its result is memoized:
//!
//! - Reads of the current time or random values that drive control flow
//! - Calls to external services
//! - Id generation
//!
//! ## Absolute instants
//!
//! `sleep_until` and `wait_for_event` with an absolute timeout are identified
//! by the target instant, not the remaining time, so they replay correctly at
//! any later wall-clock time as long as the instant itself is stable.
//!
//! ## Repeated steps
//!
//! Calling the same step twice in one invocation is allowed: the second call
//! is hashed with an occurrence index and resolves to its own result.

// This module is documentation-only.
