//! Mutable state threaded through one run.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::stats::FilterStats;

/// State owned by a single run and passed explicitly to every phase.
///
/// `discovered` holds creators persisted by Discovery, which Roll Call skips.
/// `evaluated` holds every creator that reached the personality check, so an
/// account seen under several trends is only classified once.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub today: NaiveDate,
    pub discovered: HashSet<String>,
    pub evaluated: HashSet<String>,
    /// Avatar URL per creator persisted during Discovery.
    pub new_avatars: HashMap<String, String>,
    pub stats: FilterStats,
    pub trends_committed: u64,
    pub trends_failed: u64,
}

impl RunContext {
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            today,
            discovered: HashSet::new(),
            evaluated: HashSet::new(),
            new_avatars: HashMap::new(),
            stats: FilterStats::default(),
            trends_committed: 0,
            trends_failed: 0,
        }
    }

    /// Folds one trend's outcome into the run.
    ///
    /// Creators persisted by a rolled-back trend are not marked discovered,
    /// so Roll Call still refreshes them if they were already on the roster.
    pub(crate) fn absorb(&mut self, mut work: TrendWork) {
        if !work.committed {
            work.stats.discard_persisted();
        }
        self.evaluated.extend(work.evaluated);
        self.stats.merge(&work.stats);
        if work.committed {
            self.trends_committed += 1;
            for creator in work.persisted {
                self.discovered.insert(creator.user_id.clone());
                if let Some(url) = creator.avatar_url {
                    self.new_avatars.insert(creator.user_id, url);
                }
            }
        } else {
            self.trends_failed += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PersistedCreator {
    pub user_id: String,
    pub avatar_url: Option<String>,
}

/// The outcome of one trend's unit of work.
#[derive(Debug)]
pub(crate) struct TrendWork {
    pub trend: String,
    pub evaluated: HashSet<String>,
    pub stats: FilterStats,
    pub persisted: Vec<PersistedCreator>,
    pub committed: bool,
}

impl TrendWork {
    pub(crate) fn new(trend: String, evaluated: HashSet<String>) -> Self {
        Self {
            trend,
            evaluated,
            stats: FilterStats::default(),
            persisted: Vec::new(),
            committed: false,
        }
    }
}
