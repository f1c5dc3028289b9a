//! Replay status tracking for step invocations.
//!
//! This module provides the [`ReplayStatus`] enum for tracking whether the
//! handler is still replaying memoized steps or has reached new work.

/// Replay status indicating whether we're replaying or executing new steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplayStatus {
    /// Every step seen so far was memoized
    Replay = 0,
    /// A step without a memoized result has been reached
    New = 1,
}

impl ReplayStatus {
    /// Returns true if currently in replay mode.
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replay)
    }

    /// Returns true if executing new steps.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::New)
    }
}

impl std::fmt::Display for ReplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Replay => write!(f, "replay"),
            Self::New => write!(f, "new"),
        }
    }
}
