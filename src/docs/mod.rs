//! # Documentation Modules
//!
//! Guidance on writing handlers that replay correctly.
//!
//! - [`determinism`]: what a handler must keep stable between invocations
//!
//! These modules are documentation-only and contain no executable code.

pub mod determinism;
