//! Task phase and session state machine

use serde::{Deserialize, Serialize};

/// The engine's classification of a task's progress, distinct from the raw
/// status string the remote service reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Task is waiting to start
    Pending,

    /// Task is making progress
    Running,

    /// Task finished with a result
    Completed,

    /// Task reported failure
    Failed,

    /// Status string is absent or unrecognized; polled like Running
    Unknown,
}

impl Phase {
    /// Whether this phase ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// Possible states of a streaming session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session constructed, first poll not yet made
    Initiated,

    /// Remote task is waiting to start
    Pending,

    /// Remote task is making progress
    Running,

    /// Task finished with a result
    Completed,

    /// Task reported failure
    Failed,

    /// Tick budget exhausted before a terminal phase
    TimedOut,

    /// Client disconnected or the caller revoked the task
    Cancelled,
}

impl SessionState {
    /// Check if this is a terminal state (cannot transition further)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed
                | SessionState::Failed
                | SessionState::TimedOut
                | SessionState::Cancelled
        )
    }

    /// Check if the session is still polling
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The state a non-terminal poll result moves the session into
    pub fn from_phase(phase: Phase) -> Self {
        match phase {
            Phase::Pending => SessionState::Pending,
            Phase::Running | Phase::Unknown => SessionState::Running,
            Phase::Completed => SessionState::Completed,
            Phase::Failed => SessionState::Failed,
        }
    }

    /// Get display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Initiated => "Initiated",
            SessionState::Pending => "Pending",
            SessionState::Running => "Running",
            SessionState::Completed => "Completed",
            SessionState::Failed => "Failed",
            SessionState::TimedOut => "TimedOut",
            SessionState::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
