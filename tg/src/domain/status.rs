//! Session lifecycle status

use serde::{Deserialize, Serialize};

/// Lifecycle of a progress session
///
/// `Configured -> Running -> Completed`, or `Running -> Cancelled` when the
/// caller tears the session down mid-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Task bound, clock armed, not yet started
    #[default]
    Configured,
    /// Executor and clock are live
    Running,
    /// Task finished naturally (success or failure)
    Completed,
    /// Caller requested cancellation while running
    Cancelled,
}

impl SessionStatus {
    /// Whether the session has reached a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => write!(f, "configured"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
