/// Run state definitions for harvest sessions
///
/// A session starts `Idle`, enters `Running` once, and ends in exactly one
/// terminal state.
use std::fmt;

/// Represents the lifecycle state of one harvest session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    // ===== Active States =====
    /// Session created, nothing requested yet
    Idle,

    /// Fetch/extract loop in progress
    Running,

    // ===== Terminal States =====
    /// Pagination ended normally
    Completed,

    /// Caller cancelled, or a newer session superseded this one
    Cancelled,

    /// Every route failed for a page; caller should switch to single-page mode
    Blocked,

    /// Extraction or another unexpected failure stopped the run
    Failed,
}

impl RunState {
    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::Running)
    }

    /// Returns true if moving from `self` to `next` is allowed
    pub fn can_transition_to(&self, next: RunState) -> bool {
        match self {
            Self::Idle => next == Self::Running || next == Self::Cancelled,
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    /// Returns the string representation used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Blocked => "blocked",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
