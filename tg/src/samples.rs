//! Built-in demo workloads
//!
//! Async stand-ins for real long-running work, used by the `tg` binary to
//! show the gauge adapting across runs: a slow counter, a counter that
//! fails partway, and a weighted sum over a random payload.

use std::time::Duration;

use eyre::bail;
use rand::Rng;
use serde_json::{Map, json};
use tokio::time::sleep;
use tracing::debug;

use crate::domain::TaskIdentity;
use crate::executor::Task;

/// Names accepted by `by_name`
pub const SAMPLES: &[(&str, &str)] = &[
    ("count-up", "tick once per second, return secs * 10"),
    ("flaky", "like count-up, but fails at the fifth tick"),
    ("weighted-sum", "sum <secs> random weights, ~1s per element"),
];

/// Look up a sample workload by CLI name
pub fn by_name(name: &str, secs: u32) -> Option<(Task, TaskIdentity)> {
    match name {
        "count-up" => Some(count_up(secs)),
        "flaky" => Some(flaky(secs)),
        "weighted-sum" => Some(weighted_sum(secs as usize)),
        _ => None,
    }
}

/// Tick once per second for `secs` seconds, return `secs * 10`
pub fn count_up(secs: u32) -> (Task, TaskIdentity) {
    let identity = TaskIdentity::derive("count_up", &[json!(secs)], &Map::new());
    let task = Task::new(async move {
        for i in 0..secs {
            sleep(Duration::from_secs(1)).await;
            debug!(count = i + 1, "count_up: tick");
        }
        Ok(json!(secs * 10))
    });
    (task, identity)
}

/// Like `count_up`, but errors out at the fifth tick
pub fn flaky(secs: u32) -> (Task, TaskIdentity) {
    let identity = TaskIdentity::derive("flaky", &[json!(secs)], &Map::new());
    let task = Task::new(async move {
        for i in 0..secs {
            sleep(Duration::from_secs(1)).await;
            debug!(count = i + 1, "flaky: tick");
            if i == 5 {
                bail!("Five!!");
            }
        }
        Ok(json!(secs * 10))
    });
    (task, identity)
}

/// Sum `len` random weights, sleeping ten times 100 ms per element
///
/// The payload differs every run, so the identity uses an explicit key
/// instead of rendering the arguments.
pub fn weighted_sum(len: usize) -> (Task, TaskIdentity) {
    let mut rng = rand::rng();
    let weights: Vec<f64> = (0..len).map(|_| rng.random()).collect();
    let identity = TaskIdentity::from_key(format!("weighted_sum(len={len})"));
    let task = Task::new(async move {
        let mut sum = 0.0;
        for weight in weights {
            for _ in 0..10 {
                sleep(Duration::from_millis(100)).await;
            }
            sum += weight;
            debug!(sum, "weighted_sum: element folded");
        }
        Ok(json!(sum))
    });
    (task, identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_count_up_returns_tenfold() {
        let (task, _identity) = count_up(3);
        let mut executor = crate::executor::TaskExecutor::new();
        executor.submit(task).unwrap();
        let mut rx = executor.start().unwrap();

        match rx.recv().await.unwrap() {
            crate::executor::ExecutorEvent::Succeeded(value) => assert_eq!(value, json!(30)),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_fails_at_five() {
        let (task, _identity) = flaky(10);
        let mut executor = crate::executor::TaskExecutor::new();
        executor.submit(task).unwrap();
        let mut rx = executor.start().unwrap();

        match rx.recv().await.unwrap() {
            crate::executor::ExecutorEvent::Failed(error) => assert_eq!(error.message, "Five!!"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_identities_stable_per_arguments() {
        let (_, a) = count_up(10);
        let (_, b) = count_up(10);
        let (_, c) = count_up(5);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let (_, w1) = weighted_sum(4);
        let (_, w2) = weighted_sum(4);
        assert_eq!(w1, w2);
    }

    #[test]
    fn test_by_name_covers_the_catalog() {
        for (name, _) in SAMPLES {
            assert!(by_name(name, 3).is_some(), "missing sample: {name}");
        }
        assert!(by_name("unknown", 3).is_none());
    }
}
