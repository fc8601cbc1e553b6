//! Progress session orchestration
//!
//! Wires the duration history, the animation clock, and the task executor
//! into one run: predict, animate, execute, reconcile, record. Each
//! session owns exactly one task, one identity, one elapsed measurement,
//! and one terminal outcome.
//!
//! `run()` is non-blocking: it spawns a drive loop that multiplexes
//! animation ticks, executor events, and cancellation requests, then
//! reports through the presenter and flips the status watch channel when
//! the run settles.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::ProgressClock;
use crate::config::ClockConfig;
use crate::domain::{SessionStatus, TaskError, TaskIdentity, TaskOutcome};
use crate::executor::{ExecutorError, ExecutorEvent, Task, TaskExecutor};
use crate::history::DurationHistory;
use crate::presenter::ProgressPresenter;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session was not configured with a task")]
    NotConfigured,

    #[error("session already ran its task")]
    AlreadyRan,

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Session identifier (UUIDv7)
    pub session_id: String,
    /// Task identity key the run was tracked under
    pub identity: String,
    /// Display title, when one was configured
    pub title: Option<String>,
    /// Terminal status (completed or cancelled)
    pub status: SessionStatus,
    /// Wall-clock start time
    pub started_at: DateTime<Utc>,
    /// Measured run time in milliseconds
    pub elapsed_ms: u64,
    /// Estimate the animation was paced against, in milliseconds
    pub predicted_ms: u64,
    /// The terminal outcome
    pub outcome: TaskOutcome,
}

/// State shared between the session handle and its drive loop
struct Shared {
    session_id: String,
    outcome: Mutex<Option<TaskOutcome>>,
    elapsed: Mutex<Option<Duration>>,
    status_tx: watch::Sender<SessionStatus>,
    cancel: Notify,
}

impl Shared {
    fn status(&self) -> SessionStatus {
        *self.status_tx.borrow()
    }
}

/// One predicted-and-animated run of a background task
pub struct ProgressSession {
    shared: Arc<Shared>,
    history: Arc<DurationHistory>,
    presenter: Arc<dyn ProgressPresenter>,
    executor: TaskExecutor,
    clock: Option<ProgressClock>,
    identity: Option<TaskIdentity>,
    title: Option<String>,
    predicted: Duration,
    started_wall: Option<DateTime<Utc>>,
}

impl ProgressSession {
    /// Create an unconfigured session against a shared history
    pub fn new(
        history: Arc<DurationHistory>,
        presenter: Arc<dyn ProgressPresenter>,
        clock_config: ClockConfig,
    ) -> Self {
        let session_id = uuid::Uuid::now_v7().to_string();
        debug!(%session_id, "ProgressSession::new: called");
        let (status_tx, _) = watch::channel(SessionStatus::Configured);
        Self {
            shared: Arc::new(Shared {
                session_id,
                outcome: Mutex::new(None),
                elapsed: Mutex::new(None),
                status_tx,
                cancel: Notify::new(),
            }),
            history,
            presenter,
            executor: TaskExecutor::new(),
            clock: Some(ProgressClock::new(clock_config)),
            identity: None,
            title: None,
            predicted: Duration::ZERO,
            started_wall: None,
        }
    }

    /// Bind a task and arm the clock from history
    ///
    /// Seeds the identity's history when it has none, then arms the clock
    /// with the resulting prediction. May be called again to rebind a
    /// different task as long as the session has not started.
    pub fn configure(
        &mut self,
        task: Task,
        identity: TaskIdentity,
        seed: Duration,
        title: Option<String>,
    ) -> Result<(), SessionError> {
        let Some(clock) = self.clock.as_mut() else {
            return Err(SessionError::AlreadyRan);
        };
        self.executor.submit(task)?;
        self.history.init(&identity, seed);
        let predicted = self.history.predict(&identity);
        clock.arm(predicted);
        debug!(
            session_id = %self.shared.session_id,
            identity = %identity,
            predicted_ms = predicted.as_millis() as u64,
            "ProgressSession::configure: armed"
        );
        self.predicted = predicted;
        self.identity = Some(identity);
        self.title = title;
        Ok(())
    }

    /// Start the task and the animation concurrently
    ///
    /// Non-blocking. Calling `run()` while the session is already running
    /// is a logged no-op, never a second execution.
    pub fn run(&mut self) -> Result<(), SessionError> {
        if self.executor.is_running() || self.shared.status() == SessionStatus::Running {
            warn!(session_id = %self.shared.session_id, "ProgressSession::run: already running");
            return Ok(());
        }
        if self.shared.status().is_terminal() {
            return Err(SessionError::AlreadyRan);
        }
        let identity = self.identity.clone().ok_or(SessionError::NotConfigured)?;
        let clock = self.clock.take().ok_or(SessionError::AlreadyRan)?;
        let events = self.executor.start()?;
        let abort = self.executor.abort_handle();

        self.started_wall = Some(Utc::now());
        let started = Instant::now();
        self.shared.status_tx.send_replace(SessionStatus::Running);
        info!(
            session_id = %self.shared.session_id,
            identity = %identity,
            predicted_ms = self.predicted.as_millis() as u64,
            "Session started"
        );

        let drive = Drive {
            shared: self.shared.clone(),
            history: self.history.clone(),
            presenter: self.presenter.clone(),
            identity,
            clock,
            events,
            abort,
            started,
        };
        tokio::spawn(drive.run());
        Ok(())
    }

    /// Request cancellation of an in-flight run
    ///
    /// The task is forcibly aborted; the session settles as `Cancelled`
    /// and still fires the finished notification. A no-op unless running.
    pub fn request_cancel(&self) {
        if self.shared.status() != SessionStatus::Running {
            debug!(session_id = %self.shared.session_id, "ProgressSession::request_cancel: not running");
            return;
        }
        self.shared.cancel.notify_one();
    }

    /// Wait until the session reaches a terminal state
    pub async fn finished(&self) {
        let mut rx = self.shared.status_tx.subscribe();
        // The sender lives in self, so this can only resolve by state change
        let _ = rx.wait_for(|status| status.is_terminal()).await;
    }

    /// Session identifier (UUIDv7)
    pub fn session_id(&self) -> &str {
        &self.shared.session_id
    }

    /// Current lifecycle status
    pub fn status(&self) -> SessionStatus {
        self.shared.status()
    }

    /// Display title, when one was configured
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Estimate the animation is paced against
    pub fn predicted(&self) -> Duration {
        self.predicted
    }

    /// The terminal outcome; populated once the session finishes
    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.shared.outcome.lock().ok().and_then(|slot| slot.clone())
    }

    /// The task's return value, when it succeeded
    pub fn result_value(&self) -> Option<Value> {
        self.outcome().and_then(|outcome| outcome.value().cloned())
    }

    /// The captured error, when the task failed
    pub fn error_info(&self) -> Option<TaskError> {
        self.outcome().and_then(|outcome| outcome.error().cloned())
    }

    /// Measured run time; populated once the session finishes
    pub fn elapsed(&self) -> Option<Duration> {
        self.shared.elapsed.lock().ok().and_then(|slot| *slot)
    }

    /// Printable summary; `Some` once the session reached a terminal state
    pub fn report(&self) -> Option<RunReport> {
        if !self.shared.status().is_terminal() {
            return None;
        }
        Some(RunReport {
            session_id: self.shared.session_id.clone(),
            identity: self.identity.as_ref()?.to_string(),
            title: self.title.clone(),
            status: self.shared.status(),
            started_at: self.started_wall?,
            elapsed_ms: self.elapsed()?.as_millis() as u64,
            predicted_ms: self.predicted.as_millis() as u64,
            outcome: self.outcome()?,
        })
    }
}

/// The spawned loop that reconciles animation, execution, and cancellation
struct Drive {
    shared: Arc<Shared>,
    history: Arc<DurationHistory>,
    presenter: Arc<dyn ProgressPresenter>,
    identity: TaskIdentity,
    clock: ProgressClock,
    events: mpsc::Receiver<ExecutorEvent>,
    abort: Option<AbortHandle>,
    started: Instant,
}

impl Drive {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.clock.tick_interval());
        // Catch-up ticks have no animation value
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.clock.start();

        let mut pending: Option<TaskOutcome> = None;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(pct) = self.clock.tick() {
                        self.presenter.display(pct);
                    }
                }
                _ = self.shared.cancel.notified() => {
                    if let Some(abort) = &self.abort {
                        abort.abort();
                    }
                    warn!(session_id = %self.shared.session_id, "Session cancelled while running");
                    // Cancellation stops at an arbitrary point: the partial
                    // elapsed time is not a run duration and never enters
                    // the history.
                    self.settle(TaskOutcome::closed_while_running(), SessionStatus::Cancelled);
                    return;
                }
                event = self.events.recv() => match event {
                    Some(ExecutorEvent::Succeeded(value)) => {
                        debug!(session_id = %self.shared.session_id, "Drive::run: task succeeded");
                        pending = Some(TaskOutcome::Success { value });
                    }
                    Some(ExecutorEvent::Failed(error)) => {
                        debug!(session_id = %self.shared.session_id, error = %error, "Drive::run: task failed");
                        pending = Some(TaskOutcome::Failure { error });
                    }
                    Some(ExecutorEvent::Finished) | None => {
                        self.history.record(&self.identity, self.started.elapsed());
                        let outcome = pending.take().unwrap_or_else(|| TaskOutcome::Failure {
                            error: TaskError::new(
                                "task ended without a result",
                                "executor event stream closed early",
                            ),
                        });
                        self.settle(outcome, SessionStatus::Completed);
                        return;
                    }
                }
            }
        }
    }

    /// Publish the outcome and fire the terminal notifications, in order:
    /// forced 100, failure flag (when failed), finished, status flip.
    fn settle(&mut self, outcome: TaskOutcome, status: SessionStatus) {
        let elapsed = self.started.elapsed();
        if let Ok(mut slot) = self.shared.elapsed.lock() {
            *slot = Some(elapsed);
        }
        if let Some(pct) = self.clock.finish() {
            self.presenter.display(pct);
        }
        info!(
            session_id = %self.shared.session_id,
            identity = %self.identity,
            elapsed_ms = elapsed.as_millis() as u64,
            outcome = %outcome,
            "Session finished"
        );
        let failed = outcome.is_failure();
        if let Ok(mut slot) = self.shared.outcome.lock() {
            *slot = Some(outcome);
        }
        if failed {
            self.presenter.notify_failed();
        }
        self.presenter.notify_finished();
        self.shared.status_tx.send_replace(status);
    }
}
