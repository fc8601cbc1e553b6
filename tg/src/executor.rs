//! Single-task executor
//!
//! Runs one submitted task on the tokio runtime and reports its terminal
//! events over a channel: `Succeeded` or `Failed`, then exactly one
//! `Finished`. One task in flight per executor instance; a second submit
//! while running fails fast.
//!
//! Cancellation is forced, not cooperative: `cancel()` aborts the task at
//! its next await point without any shutdown hook, so resources the task
//! holds (files, locks) can leak. An aborted run emits no events at all.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

use crate::domain::TaskError;

/// A deferred unit of work producing a JSON value
pub struct Task(BoxFuture<'static, eyre::Result<Value>>);

impl Task {
    /// Box a future as a task
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = eyre::Result<Value>> + Send + 'static,
    {
        Self(Box::pin(fut))
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

/// Events emitted by a running task, in order
#[derive(Debug)]
pub enum ExecutorEvent {
    /// Task returned normally
    Succeeded(Value),
    /// Task returned an error or panicked
    Failed(TaskError),
    /// Terminal notification, always last, exactly once
    Finished,
}

/// Errors from executor operations
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("a task is already running on this executor")]
    Busy,

    #[error("no task submitted")]
    NoTask,
}

/// Executes one task at a time on the tokio runtime
#[derive(Debug, Default)]
pub struct TaskExecutor {
    slot: Option<Task>,
    handle: Option<JoinHandle<()>>,
}

impl TaskExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a task for the next `start()`
    ///
    /// Replaces any not-yet-started task; rejects with `Busy` while a
    /// previous task on this instance is still running.
    pub fn submit(&mut self, task: Task) -> Result<(), ExecutorError> {
        if self.is_running() {
            return Err(ExecutorError::Busy);
        }
        debug!(replacing = self.slot.is_some(), "TaskExecutor::submit: task bound");
        self.slot = Some(task);
        Ok(())
    }

    /// Spawn the submitted task, returning its event stream
    ///
    /// Task-body failures and panics are caught at this boundary and
    /// converted to `Failed`; they never propagate further.
    pub fn start(&mut self) -> Result<mpsc::Receiver<ExecutorEvent>, ExecutorError> {
        if self.is_running() {
            return Err(ExecutorError::Busy);
        }
        let task = self.slot.take().ok_or(ExecutorError::NoTask)?;

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(task.0).catch_unwind().await;
            let event = match result {
                Ok(Ok(value)) => ExecutorEvent::Succeeded(value),
                Ok(Err(report)) => ExecutorEvent::Failed(TaskError::from_report(&report)),
                Err(panic) => ExecutorEvent::Failed(TaskError::from_panic(panic.as_ref())),
            };
            // Receiver gone means the session is already tearing down
            let _ = tx.send(event).await;
            let _ = tx.send(ExecutorEvent::Finished).await;
        });

        self.handle = Some(handle);
        debug!("TaskExecutor::start: task spawned");
        Ok(rx)
    }

    /// Whether a task spawned by this executor is still in flight
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort handle for the in-flight task, if any
    pub(crate) fn abort_handle(&self) -> Option<AbortHandle> {
        self.handle.as_ref().map(JoinHandle::abort_handle)
    }

    /// Forcibly terminate the in-flight task
    ///
    /// Returns whether a live task was actually aborted. The task stops
    /// at its next await point and emits no further events.
    pub fn cancel(&mut self) -> bool {
        match &self.handle {
            Some(handle) if !handle.is_finished() => {
                debug!("TaskExecutor::cancel: aborting task");
                handle.abort();
                true
            }
            _ => false,
        }
    }
}
