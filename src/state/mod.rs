//! Per-invocation execution state.
//!
//! An [`ExecutionState`] is built fresh at the start of every invocation from
//! the results the orchestrator supplies, and discarded when the invocation
//! ends. Durability lives entirely in the orchestrator.
//!
//! ## Module Structure
//!
//! - `replay_status` - Replay state tracking
//! - `execution_state` - Memoized results, op planning and the next op

mod execution_state;
mod replay_status;

pub use execution_state::{ExecutionState, PlannedOp, SharedExecutionState};
pub use replay_status::ReplayStatus;
