//! Run-scoped counters. Reported and logged, never persisted.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// Per-item outcomes of the Discovery phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub processed: u64,
    pub rejected_platform: u64,
    pub rejected_caption: u64,
    pub rejected_criteria: u64,
    pub rejected_missing_id: u64,
    pub rejected_blacklist: u64,
    pub skipped_evaluated: u64,
    pub rejected_personality: u64,
    pub passed: u64,
    pub persisted: u64,
    pub persist_failed: u64,
    /// Persisted inside a trend unit that was later rolled back.
    pub rolled_back: u64,
}

impl FilterStats {
    pub fn merge(&mut self, other: &Self) {
        self.processed += other.processed;
        self.rejected_platform += other.rejected_platform;
        self.rejected_caption += other.rejected_caption;
        self.rejected_criteria += other.rejected_criteria;
        self.rejected_missing_id += other.rejected_missing_id;
        self.rejected_blacklist += other.rejected_blacklist;
        self.skipped_evaluated += other.skipped_evaluated;
        self.rejected_personality += other.rejected_personality;
        self.passed += other.passed;
        self.persisted += other.persisted;
        self.persist_failed += other.persist_failed;
        self.rolled_back += other.rolled_back;
    }

    /// Moves `persisted` into `rolled_back` after the owning unit aborted.
    pub fn discard_persisted(&mut self) {
        self.rolled_back += self.persisted;
        self.persisted = 0;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RollCallStats {
    pub updated: u64,
    pub failed: u64,
    /// Already refreshed by Discovery in this run.
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AvatarStats {
    pub attempted: u64,
    pub cached: u64,
    pub unchanged: u64,
    pub write_failed: u64,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub trends: Vec<String>,
    pub trends_committed: u64,
    pub trends_failed: u64,
    pub discovery: FilterStats,
    pub avatars: AvatarStats,
    pub roll_call: RollCallStats,
    pub evicted: u64,
    /// Phases whose unit of work was rolled back.
    pub failed_phases: Vec<&'static str>,
}

impl RunSummary {
    /// Number of distinct creators touched by the run.
    #[must_use]
    pub fn creators_touched(&self) -> u64 {
        self.discovery.persisted + self.roll_call.updated
    }
}
