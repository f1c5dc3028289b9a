//! Main execution state management.
//!
//! This module provides the [`ExecutionState`] struct which holds the
//! memoized step results for one invocation, assigns each step tool call its
//! position and hash, and records the single next op discovered.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::StepError;
use crate::hash::OpIdentity;
use crate::operation::{OpOpts, StepOp, StepOpCode, StepResult};

use super::replay_status::ReplayStatus;

/// Execution state shared between the step tools of one invocation.
pub type SharedExecutionState = Arc<Mutex<ExecutionState>>;

/// An op built for a step tool call, with its memoized result if one exists.
#[derive(Debug, Clone)]
pub struct PlannedOp {
    /// The op, without data
    pub op: StepOp,
    /// The orchestrator-supplied result for this op's hash
    pub memoized: Option<StepResult>,
}

/// Holds the state of one handler invocation.
///
/// `memoized` is read-only for the lifetime of the invocation and `next_op`
/// is set at most once. The first unmemoized op planned reserves the pending
/// slot; from then on every further step tool call is interrupted, even
/// while the reserved step's function is still running.
#[derive(Debug)]
pub struct ExecutionState {
    /// Map of op hash to previously resolved result
    memoized: HashMap<String, StepResult>,

    /// The first unmemoized op found this invocation, once settled
    next_op: Option<StepOp>,

    /// The first unmemoized op planned, until it is suspended
    reserved: Option<StepOp>,

    /// Number of step tool calls made so far
    position: usize,

    /// Number of times each base hash has been planned
    occurrences: HashMap<String, u32>,

    /// Current replay status (Replay or New)
    replay_status: ReplayStatus,

    /// Number of steps resolved from memoized results
    replayed: usize,
}

impl ExecutionState {
    /// Creates a new ExecutionState from orchestrator-supplied results.
    pub fn new(memoized: HashMap<String, StepResult>) -> Self {
        let replay_status = if memoized.is_empty() {
            ReplayStatus::New
        } else {
            ReplayStatus::Replay
        };

        Self {
            memoized,
            next_op: None,
            reserved: None,
            position: 0,
            occurrences: HashMap::new(),
            replay_status,
            replayed: 0,
        }
    }

    /// Creates an ExecutionState with no memoized results.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Wraps this state for sharing between step tools.
    pub fn into_shared(self) -> SharedExecutionState {
        Arc::new(Mutex::new(self))
    }

    /// Builds the op for a step tool call and looks up its memoized result.
    ///
    /// Every call advances the position counter. Repeats of an identical op
    /// within this invocation are hashed with their occurrence index so each
    /// repeat resolves to its own result.
    ///
    /// Returns the interrupt signal if another op already holds the pending
    /// slot. Planning an unmemoized op reserves the slot for it.
    pub fn plan(
        &mut self,
        op: StepOpCode,
        id: &str,
        opts: OpOpts,
    ) -> Result<PlannedOp, StepError> {
        let identity = OpIdentity::new(id, opts.clone());
        self.plan_with_identity(op, id, opts, identity)
    }

    /// Like [`plan`](Self::plan), but hashes `identity` instead of the
    /// emitted id and options.
    pub fn plan_with_identity(
        &mut self,
        op: StepOpCode,
        id: &str,
        opts: OpOpts,
        identity: OpIdentity,
    ) -> Result<PlannedOp, StepError> {
        let pos = self.position;
        self.position += 1;

        if let Some(pending) = self.next_op.as_ref().or(self.reserved.as_ref()) {
            tracing::warn!(
                op = %op,
                id = id,
                pos = pos,
                pending = %pending.hash,
                "Step tool called while another step is pending"
            );
            return Err(StepError::interrupt(pending));
        }

        let base_hash = identity.hash(op, 0)?;
        let occurrence = {
            let seen = self.occurrences.entry(base_hash.clone()).or_insert(0);
            let occurrence = *seen;
            *seen += 1;
            occurrence
        };
        let hash = if occurrence == 0 {
            base_hash
        } else {
            identity.hash(op, occurrence)?
        };

        let memoized = self.memoized.get(&hash).cloned();
        if memoized.is_some() {
            self.replayed += 1;
        } else {
            self.replay_status = ReplayStatus::New;
        }

        tracing::debug!(
            op = %op,
            id = id,
            hash = %hash,
            pos = pos,
            occurrence = occurrence,
            memoized = memoized.is_some(),
            "Planned step op"
        );

        let op = StepOp::new(op, id, opts, hash, pos);
        if memoized.is_none() {
            self.reserved = Some(op.clone());
        }

        Ok(PlannedOp { op, memoized })
    }

    /// Records `op` as the next op and returns the interrupt signal.
    ///
    /// If a next op was already recorded, or the pending slot is reserved
    /// for a different op, the existing op is kept and `op` is discarded.
    pub fn suspend(&mut self, op: StepOp) -> StepError {
        let holder = match (&self.next_op, &self.reserved) {
            (Some(existing), _) => Some(existing),
            (None, Some(reserved)) if reserved.hash != op.hash => Some(reserved),
            _ => None,
        };
        if let Some(existing) = holder {
            tracing::warn!(
                discarded = %op.hash,
                pending = %existing.hash,
                "Pending slot held by another op; discarding op"
            );
            return StepError::interrupt(existing);
        }

        tracing::debug!(op = %op.op, id = %op.id, hash = %op.hash, pos = op.pos, "Recorded next op");
        let interrupt = StepError::interrupt(&op);
        self.reserved = None;
        self.next_op = Some(op);
        interrupt
    }

    /// Frees the pending slot reserved for `hash` without recording an op.
    ///
    /// Used when a planned step fails before it can be suspended.
    pub fn release(&mut self, hash: &str) {
        if self.reserved.as_ref().is_some_and(|op| op.hash == hash) {
            self.reserved = None;
        }
    }

    /// Returns the next op, if one was recorded.
    pub fn next_op(&self) -> Option<&StepOp> {
        self.next_op.as_ref()
    }

    /// Takes the next op out of the state.
    ///
    /// Falls back to the reserved op when its step was planned but never
    /// suspended, e.g. because the handler dropped the step's future.
    pub fn take_next_op(&mut self) -> Option<StepOp> {
        if let Some(op) = self.next_op.take() {
            return Some(op);
        }
        let reserved = self.reserved.take()?;
        tracing::warn!(
            op = %reserved.op,
            id = %reserved.id,
            hash = %reserved.hash,
            "Reserved step never settled; reporting it without a result"
        );
        Some(reserved)
    }

    /// Returns true if a next op was recorded.
    pub fn has_next_op(&self) -> bool {
        self.next_op.is_some()
    }

    /// Returns the number of step tool calls made so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the current replay status.
    pub fn replay_status(&self) -> ReplayStatus {
        self.replay_status
    }

    /// Returns true if every step seen so far was memoized.
    pub fn is_replay(&self) -> bool {
        self.replay_status.is_replay()
    }

    /// Returns the number of steps resolved from memoized results.
    pub fn replayed_count(&self) -> usize {
        self.replayed
    }

    /// Returns the number of memoized results supplied for this invocation.
    pub fn memoized_count(&self) -> usize {
        self.memoized.len()
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::empty()
    }
}
