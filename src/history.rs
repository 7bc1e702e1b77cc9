//! history.rs: in-memory log of recent sync runs for the admin trigger.
//!
//! Lives on the trigger side only; the engine itself keeps nothing between runs.

use std::sync::{Mutex, MutexGuard};

use crate::sync::summary::RunSummary;

const MAX_CAPACITY: usize = 1_000;

#[derive(Debug)]
pub struct RunHistory {
    inner: Mutex<Vec<RunSummary>>,
    cap: usize,
}

impl RunHistory {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_CAPACITY);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RunSummary>> {
        // A panic while pushing cannot leave the Vec half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, summary: RunSummary) {
        let mut v = self.lock();
        v.push(summary);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Up to `n` most recent runs, oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunSummary> {
        let v = self.lock();
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::summary::SummaryBuilder;
    use chrono::{Duration, Utc};

    fn run(ms: i64) -> RunSummary {
        let t0 = Utc::now();
        SummaryBuilder::start(t0).finish(t0 + Duration::milliseconds(ms))
    }

    #[test]
    fn keeps_only_the_newest_runs() {
        let h = RunHistory::with_capacity(2);
        h.push(run(1));
        h.push(run(2));
        h.push(run(3));

        let all = h.snapshot_last_n(10);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].duration_ms, 2);
        assert_eq!(all[1].duration_ms, 3);
        assert_eq!(h.snapshot_last_n(1)[0].duration_ms, 3);
    }

    #[test]
    fn empty_history_is_empty() {
        let h = RunHistory::with_capacity(0);
        assert!(h.snapshot_last_n(1).is_empty());
        assert!(h.snapshot_last_n(5).is_empty());
    }
}
