//! Sliding-window request limiter.
//!
//! Admission counts requests per client key over the trailing window (not
//! fixed buckets). All state sits behind one mutex; a background sweep
//! evicts keys that have gone quiet so one-off clients do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

type History = HashMap<String, Vec<Instant>>;

pub struct SlidingWindowLimiter {
    state: Arc<Mutex<History>>,
    limit: usize,
    window: Duration,
    stop: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SlidingWindowLimiter {
    /// Allow `limit` requests per key within any trailing `window`. Spawns
    /// the eviction sweep; must be called from within a tokio runtime.
    pub fn new(limit: usize, window: Duration) -> Self {
        let state = Arc::new(Mutex::new(History::new()));
        let (stop, stop_rx) = watch::channel(false);
        let sweeper = tokio::spawn(sweep_loop(state.clone(), window, stop_rx));

        SlidingWindowLimiter {
            state,
            limit,
            window,
            stop,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Admit or reject a request for `key` at the current instant. Admitted
    /// requests are recorded; rejected ones are not.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stamps = state.entry(key.to_string()).or_default();

        stamps.retain(|stamp| now.duration_since(*stamp) < self.window);
        if stamps.len() >= self.limit {
            tracing::warn!(key, requests = stamps.len(), "rate limit exceeded");
            return false;
        }
        stamps.push(now);
        true
    }

    /// Stop the eviction sweep and wait for it to finish. Idempotent.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn sweep_loop(state: Arc<Mutex<History>>, window: Duration, mut stop: watch::Receiver<bool>) {
    let period = (window * 2).max(Duration::from_millis(10));
    let mut ticker = tokio::time::interval(period);
    // The first tick of an interval completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => evict_idle(&state, window),
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}

/// Drop every key whose newest request already left the window.
fn evict_idle(state: &Mutex<History>, window: Duration) {
    let now = Instant::now();
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    state.retain(|_, stamps| {
        stamps
            .last()
            .is_some_and(|newest| now.duration_since(*newest) < window)
    });
}
