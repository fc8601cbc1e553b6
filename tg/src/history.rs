//! Duration history and prediction
//!
//! Rolling per-identity store of recently observed run durations. The mean
//! of the retained window paces the animation clock the next time the same
//! identity runs. The store is an injectable service shared across
//! sessions, never a process-wide global; each call is its own critical
//! section.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Duration;

use tracing::debug;

use crate::config::HistoryConfig;
use crate::domain::TaskIdentity;

/// Shared store of observed run durations, keyed by task identity
#[derive(Debug, Default)]
pub struct DurationHistory {
    config: HistoryConfig,
    inner: RwLock<HashMap<TaskIdentity, VecDeque<Duration>>>,
}

impl DurationHistory {
    /// Create an empty history with the given tuning
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Seed an identity that has no history yet
    ///
    /// Creates a single-entry window holding `seed`. A no-op when the
    /// identity already has observations: the seed is an initial guess,
    /// never a measurement, and must not overwrite real data.
    pub fn init(&self, identity: &TaskIdentity, seed: Duration) {
        if let Ok(mut inner) = self.inner.write() {
            if inner.contains_key(identity) {
                return;
            }
            let seed = seed.max(self.config.floor());
            debug!(identity = %identity, seed_ms = seed.as_millis() as u64, "DurationHistory::init: seeded");
            inner.insert(identity.clone(), VecDeque::from([seed]));
        }
    }

    /// Record an observed run duration
    ///
    /// Appends to the identity's window, evicting the oldest observation
    /// once the window is full. Durations below the configured floor are
    /// clamped up so a degenerate measurement can never produce a zero
    /// predicted duration.
    pub fn record(&self, identity: &TaskIdentity, duration: Duration) {
        let duration = duration.max(self.config.floor());
        if let Ok(mut inner) = self.inner.write() {
            let window = inner.entry(identity.clone()).or_default();
            if window.len() >= self.config.window {
                window.pop_front();
            }
            window.push_back(duration);
            debug!(
                identity = %identity,
                duration_ms = duration.as_millis() as u64,
                observations = window.len(),
                "DurationHistory::record: observed"
            );
        }
    }

    /// Predict the next run duration for an identity
    ///
    /// Arithmetic mean of the retained window. Returns `Duration::ZERO`
    /// for an unknown identity; callers are expected to `init` first.
    pub fn predict(&self, identity: &TaskIdentity) -> Duration {
        let predicted = self
            .inner
            .read()
            .ok()
            .and_then(|inner| {
                let window = inner.get(identity)?;
                if window.is_empty() {
                    return None;
                }
                Some(window.iter().sum::<Duration>() / window.len() as u32)
            })
            .unwrap_or(Duration::ZERO);
        debug!(identity = %identity, predicted_ms = predicted.as_millis() as u64, "DurationHistory::predict: called");
        predicted
    }

    /// Number of observations retained for an identity
    pub fn observations(&self, identity: &TaskIdentity) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|inner| inner.get(identity).map(VecDeque::len))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> DurationHistory {
        DurationHistory::new(HistoryConfig::default())
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_predict_unknown_identity_is_zero() {
        let history = history();
        assert_eq!(history.predict(&"f()".into()), Duration::ZERO);
    }

    #[test]
    fn test_seed_precedence() {
        let history = history();
        let id = TaskIdentity::from("f()");

        history.init(&id, secs(7));
        assert_eq!(history.predict(&id), secs(7));
    }

    #[test]
    fn test_init_never_overwrites() {
        let history = history();
        let id = TaskIdentity::from("f()");

        history.init(&id, secs(7));
        history.record(&id, secs(2));
        history.init(&id, secs(30));

        // Window is still [7, 2]
        assert_eq!(history.observations(&id), 2);
        assert_eq!(history.predict(&id), Duration::from_millis(4500));
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let history = history();
        let id = TaskIdentity::from("f()");

        history.record(&id, secs(4));
        history.record(&id, secs(6));
        history.record(&id, secs(5));
        assert_eq!(history.predict(&id), secs(5));

        // Fourth observation evicts the 4s run: mean of [6, 5, 9]
        history.record(&id, secs(9));
        assert_eq!(history.observations(&id), 3);
        assert_eq!(history.predict(&id), Duration::from_secs(20) / 3);
    }

    #[test]
    fn test_window_bound_holds_under_many_records() {
        let history = history();
        let id = TaskIdentity::from("f()");

        for s in 1..=10 {
            history.record(&id, secs(s));
        }

        // Only the 3 most recent survive: mean of [8, 9, 10]
        assert_eq!(history.observations(&id), 3);
        assert_eq!(history.predict(&id), secs(9));
    }

    #[test]
    fn test_degenerate_durations_clamped_to_floor() {
        let history = history();
        let id = TaskIdentity::from("f()");

        history.record(&id, Duration::ZERO);
        assert_eq!(history.predict(&id), Duration::from_millis(100));

        let seeded = TaskIdentity::from("g()");
        history.init(&seeded, Duration::ZERO);
        assert_eq!(history.predict(&seeded), Duration::from_millis(100));
    }

    #[test]
    fn test_identities_tracked_independently() {
        let history = history();
        let ten = TaskIdentity::from("count_up(10)");
        let five = TaskIdentity::from("count_up(5)");

        history.record(&ten, secs(10));
        history.record(&five, secs(5));

        assert_eq!(history.predict(&ten), secs(10));
        assert_eq!(history.predict(&five), secs(5));
    }
}
