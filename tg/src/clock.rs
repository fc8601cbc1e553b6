//! Progress animation clock
//!
//! Interpolates a percentage against a *predicted* duration. The clock
//! never sees true task progress: it paces a bar from elapsed wall time,
//! holds at the ceiling when the task overruns the estimate, and emits the
//! final 100 only when `finish()` reports that the task really ended. The
//! visible stall at 99% on overrun is deliberate cushioning, not a defect.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ClockConfig;

/// The forced final percentage emitted by `finish()`
pub const FINAL_PERCENT: u8 = 100;

/// Clock lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockState {
    Idle,
    Running,
    Finished,
}

/// Interpolate a capped percentage from elapsed wall time
///
/// Floor of `elapsed / predicted * 100`, capped at `ceiling`. A zero
/// predicted duration pins the result at the ceiling: the estimate said
/// "instant", so the bar has nowhere to animate.
pub fn percentage(elapsed: Duration, predicted: Duration, ceiling: u8) -> u8 {
    if predicted.is_zero() {
        return ceiling;
    }
    let ratio = elapsed.as_secs_f64() / predicted.as_secs_f64();
    ((ratio * 100.0) as u64).min(u64::from(ceiling)) as u8
}

/// Paces a 0-100 bar against a predicted duration
///
/// `Idle -> Running -> Finished`. The session drives `tick()` from a
/// periodic interval; the clock itself never sleeps.
#[derive(Debug)]
pub struct ProgressClock {
    config: ClockConfig,
    state: ClockState,
    predicted: Duration,
    started_at: Option<Instant>,
    last_emitted: Option<u8>,
}

impl ProgressClock {
    /// Create an idle, unarmed clock
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            state: ClockState::Idle,
            predicted: Duration::ZERO,
            started_at: None,
            last_emitted: None,
        }
    }

    /// Store the predicted duration and reset the emission state
    ///
    /// Valid only while idle; arming a running or finished clock is a
    /// logged no-op.
    pub fn arm(&mut self, predicted: Duration) {
        if self.state != ClockState::Idle {
            warn!(state = ?self.state, "ProgressClock::arm: clock is not idle");
            return;
        }
        debug!(predicted_ms = predicted.as_millis() as u64, "ProgressClock::arm: called");
        self.predicted = predicted;
        self.started_at = None;
        self.last_emitted = None;
    }

    /// Begin pacing: `Idle -> Running`, capturing the start instant
    pub fn start(&mut self) {
        if self.state != ClockState::Idle {
            warn!(state = ?self.state, "ProgressClock::start: clock is not idle");
            return;
        }
        self.state = ClockState::Running;
        self.started_at = Some(Instant::now());
    }

    /// Recompute the capped percentage, returning it when it changed
    ///
    /// Only a running clock emits. Repeat values are swallowed so the
    /// emission sequence is exactly the sequence of distinct bar values,
    /// strictly non-decreasing and capped at the ceiling.
    pub fn tick(&mut self) -> Option<u8> {
        if self.state != ClockState::Running {
            return None;
        }
        let pct = percentage(self.elapsed(), self.predicted, self.config.ceiling);
        if self.last_emitted == Some(pct) {
            return None;
        }
        self.last_emitted = Some(pct);
        Some(pct)
    }

    /// Force the final 100: `-> Finished`, stopping all further emission
    ///
    /// Idempotent. From `Idle` (nothing ever started) this recovers as a
    /// logged no-op without emitting, since no bar was ever shown.
    pub fn finish(&mut self) -> Option<u8> {
        match self.state {
            ClockState::Finished => None,
            ClockState::Idle => {
                warn!("ProgressClock::finish: called before start");
                self.state = ClockState::Finished;
                None
            }
            ClockState::Running => {
                self.state = ClockState::Finished;
                self.last_emitted = Some(FINAL_PERCENT);
                Some(FINAL_PERCENT)
            }
        }
    }

    /// Interval between animation ticks: `predicted / 100`, floored
    ///
    /// The floor keeps a tiny or zero estimate from arming a zero-period
    /// (infinite-rate) timer.
    pub fn tick_interval(&self) -> Duration {
        (self.predicted / 100).max(self.config.min_tick())
    }

    /// The predicted duration this clock paces against
    pub fn predicted(&self) -> Duration {
        self.predicted
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    pub fn is_finished(&self) -> bool {
        self.state == ClockState::Finished
    }

    fn elapsed(&self) -> Duration {
        self.started_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO)
    }
}
