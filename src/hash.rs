//! Deterministic op hashing.
//!
//! The hash of an op is the durable correlation key between invocations: the
//! orchestrator stores each step's result under it and hands the results back
//! on replay. It must therefore depend only on what the handler asked for,
//! never on timestamps, addresses or map iteration order.
//!
//! # Canonical form
//!
//! The digest is SHA-1 over compact JSON with a fixed field order:
//!
//! ```text
//! {"op":"WaitForEvent","id":"event","opts":{"match":"...","ttl":"..."}}
//! ```
//!
//! `opts` keys are emitted in sorted order with absent options omitted. When
//! the same op is requested more than once in one invocation, repeats append
//! `"occurrence":n` so each repeat gets its own key.

use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::error::StepError;
use crate::operation::{OpOpts, StepOpCode};

#[derive(Serialize)]
struct CanonicalOp<'a> {
    op: StepOpCode,
    id: &'a str,
    opts: &'a OpOpts,
    #[serde(skip_serializing_if = "is_first")]
    occurrence: u32,
}

fn is_first(occurrence: &u32) -> bool {
    *occurrence == 0
}

/// The part of an op that identifies it across invocations.
///
/// Usually this is the op's own id and options. Ops whose emitted id or TTL
/// is computed relative to "now" are identified by their absolute target
/// instead, so that a replay at a later time still finds their result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpIdentity {
    /// Identifying id
    pub id: String,
    /// Identifying options
    pub opts: OpOpts,
}

impl OpIdentity {
    /// Creates a new OpIdentity.
    pub fn new(id: impl Into<String>, opts: OpOpts) -> Self {
        Self {
            id: id.into(),
            opts,
        }
    }

    /// Hashes the `occurrence`-th use of this identity for `op`.
    pub fn hash(&self, op: StepOpCode, occurrence: u32) -> Result<String, StepError> {
        hash_op_occurrence(op, &self.id, &self.opts, occurrence)
    }
}

/// Hashes an op, returning a 40 character lowercase hex SHA-1 digest.
///
/// # Example
///
/// ```rust
/// use durable_step_sdk::hash::hash_op;
/// use durable_step_sdk::operation::{OpOpts, StepOpCode};
///
/// let hash = hash_op(StepOpCode::WaitForEvent, "event", &OpOpts::default()).unwrap();
/// assert_eq!(hash, "f502ede21ad045e90a78c6c55e3feb235cd034f3");
/// ```
pub fn hash_op(op: StepOpCode, id: &str, opts: &OpOpts) -> Result<String, StepError> {
    hash_op_occurrence(op, id, opts, 0)
}

/// Hashes the `occurrence`-th repeat of an op within one invocation.
///
/// Occurrence 0 is identical to [`hash_op`].
pub fn hash_op_occurrence(
    op: StepOpCode,
    id: &str,
    opts: &OpOpts,
    occurrence: u32,
) -> Result<String, StepError> {
    let canonical = canonical_bytes(op, id, opts, occurrence)?;
    Ok(format!("{:x}", Sha1::digest(&canonical)))
}

fn canonical_bytes(
    op: StepOpCode,
    id: &str,
    opts: &OpOpts,
    occurrence: u32,
) -> Result<Vec<u8>, StepError> {
    serde_json::to_vec(&CanonicalOp {
        op,
        id,
        opts,
        occurrence,
    })
    .map_err(|e| StepError::serdes(format!("Failed to canonicalize op '{}': {}", id, e)))
}
