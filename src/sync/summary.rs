// src/sync/summary.rs
//! Per-item outcomes and the aggregated run report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::ItemId;

/// Why one item could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub id: ItemId,
    pub sku: String,
    pub reason: String,
}

/// Exactly one per attempted item per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Failure(Failure),
}

impl SyncOutcome {
    pub fn failed(id: ItemId, sku: impl Into<String>, reason: impl ToString) -> Self {
        Self::Failure(Failure {
            id,
            sku: sku.into(),
            reason: reason.to_string(),
        })
    }
}

/// Result of one run, serialized as the trigger's JSON response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(rename = "total")]
    pub total_attempted: usize,
    #[serde(rename = "updated")]
    pub succeeded: usize,
    pub failed: usize,
    #[serde(rename = "errors")]
    pub failures: Vec<Failure>,
}

impl RunSummary {
    /// `succeeded + failed == total_attempted` and one failure record per failure.
    pub fn is_consistent(&self) -> bool {
        self.succeeded + self.failed == self.total_attempted && self.failures.len() == self.failed
    }
}

/// Pure tally of outcomes between a start and a finish instant.
#[derive(Debug)]
pub struct SummaryBuilder {
    started_at: DateTime<Utc>,
    succeeded: usize,
    failures: Vec<Failure>,
}

impl SummaryBuilder {
    pub fn start(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Success => self.succeeded += 1,
            SyncOutcome::Failure(f) => self.failures.push(f),
        }
    }

    pub fn finish(self, finished_at: DateTime<Utc>) -> RunSummary {
        let duration_ms = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        let failed = self.failures.len();
        RunSummary {
            started_at: self.started_at,
            finished_at,
            duration_ms,
            total_attempted: self.succeeded + failed,
            succeeded: self.succeeded,
            failed,
            failures: self.failures,
        }
    }
}

impl Extend<SyncOutcome> for SummaryBuilder {
    fn extend<I: IntoIterator<Item = SyncOutcome>>(&mut self, iter: I) {
        for o in iter {
            self.record(o);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn empty_run_is_all_zero() {
        let t0 = Utc::now();
        let s = SummaryBuilder::start(t0).finish(t0);
        assert_eq!(s.total_attempted, 0);
        assert_eq!(s.succeeded, 0);
        assert_eq!(s.failed, 0);
        assert!(s.failures.is_empty());
        assert_eq!(s.duration_ms, 0);
        assert!(s.is_consistent());
    }

    #[test]
    fn tallies_outcomes_in_order() {
        let t0 = Utc::now();
        let mut b = SummaryBuilder::start(t0);
        b.extend([
            SyncOutcome::Success,
            SyncOutcome::failed(ItemId::from(2), "B", "provider returned HTTP 500"),
            SyncOutcome::Success,
            SyncOutcome::failed(ItemId::from(4), "D", "catalog row 4 does not exist"),
        ]);
        let s = b.finish(t0 + Duration::milliseconds(250));

        assert_eq!(s.total_attempted, 4);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.failed, 2);
        assert_eq!(s.duration_ms, 250);
        assert_eq!(s.failures[0].sku, "B");
        assert_eq!(s.failures[1].sku, "D");
        assert!(s.is_consistent());
    }

    #[test]
    fn serializes_trigger_contract() {
        let t0 = Utc::now();
        let mut b = SummaryBuilder::start(t0);
        b.record(SyncOutcome::failed(ItemId::from(9), "X", "boom"));
        let v = serde_json::to_value(b.finish(t0)).unwrap();

        for key in ["startedAt", "finishedAt", "durationMs", "total", "updated", "failed", "errors"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert_eq!(v["errors"][0]["id"], "9");
        assert_eq!(v["errors"][0]["sku"], "X");
        assert_eq!(v["errors"][0]["reason"], "boom");
    }

    #[test]
    fn clock_going_backwards_clamps_duration() {
        let t0 = Utc::now();
        let s = SummaryBuilder::start(t0).finish(t0 - Duration::seconds(1));
        assert_eq!(s.duration_ms, 0);
    }
}
