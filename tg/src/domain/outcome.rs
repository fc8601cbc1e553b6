//! Terminal outcome types
//!
//! Exactly one TaskOutcome closes out each session: the task's return
//! value, the error captured at the execution boundary, or the
//! cancellation marker.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker carried by outcomes of sessions torn down mid-flight
pub const CLOSED_WHILE_RUNNING: &str = "closed while running";

/// Error captured at the task execution boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Rendered root-cause message
    pub message: String,
    /// Rendered error chain, or a panic note
    pub trace: String,
}

impl TaskError {
    /// Create an error from pre-rendered text
    pub fn new(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Render an error report returned by a task body
    pub(crate) fn from_report(report: &eyre::Report) -> Self {
        Self {
            message: report.to_string(),
            trace: format!("{report:?}"),
        }
    }

    /// Render a panic payload caught at the execution boundary
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string());
        Self {
            trace: format!("panic: {message}"),
            message,
        }
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TaskError {}

/// The single terminal result closing out a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TaskOutcome {
    /// Task returned normally
    Success {
        /// The task's return value
        value: Value,
    },
    /// Task raised an error or panicked
    Failure {
        /// Error captured at the execution boundary
        error: TaskError,
    },
    /// Session was torn down before the task finished
    Cancelled {
        /// Why the run was cancelled
        reason: String,
    },
}

impl TaskOutcome {
    /// Build the cancellation outcome for a session closed mid-flight
    pub fn closed_while_running() -> Self {
        Self::Cancelled {
            reason: CLOSED_WHILE_RUNNING.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The return value, when the task succeeded
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }

    /// The captured error, when the task failed
    pub fn error(&self) -> Option<&TaskError> {
        match self {
            Self::Failure { error } => Some(error),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success { .. } => write!(f, "success"),
            Self::Failure { error } => write!(f, "failure: {}", error.message),
            Self::Cancelled { reason } => write!(f, "cancelled: {reason}"),
        }
    }
}
