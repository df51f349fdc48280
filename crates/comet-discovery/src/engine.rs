use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use comet_classifier::Classifier;
use comet_core::{AppConfig, CometCriteria, ContextFilter, FilterPolicy};
use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::avatar::AvatarCache;
use crate::context::RunContext;
use crate::error::EngineError;
use crate::pacing::Pacing;
use crate::sources::{ProfileFetcher, TrendSource, VideoSearch};
use crate::stats::{AvatarStats, RollCallStats, RunSummary};
use crate::store::{RosterStore, StoreSource};

/// Tunables for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub criteria: CometCriteria,
    pub policy: FilterPolicy,
    pub trend_fetch_limit: usize,
    pub trend_region: String,
    pub top_trends: usize,
    pub max_search_pages: u32,
    pub fetch_profile_in_discovery: bool,
    pub stale_creator_days: u32,
    pub parallel_workers: usize,
    pub download_concurrency: usize,
    /// Minimum gap between consecutive calls to the same external API,
    /// held across phases and workers.
    pub inter_request_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            criteria: CometCriteria::default(),
            policy: FilterPolicy::default(),
            trend_fetch_limit: 100,
            trend_region: "US".to_string(),
            top_trends: 10,
            max_search_pages: 10,
            fetch_profile_in_discovery: true,
            stale_creator_days: 14,
            parallel_workers: 1,
            download_concurrency: 2,
            inter_request_delay: Duration::from_millis(500),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            criteria: config.criteria,
            policy: config.policy.clone(),
            trend_fetch_limit: config.trend_fetch_limit,
            trend_region: config.trend_region.clone(),
            top_trends: config.top_trends,
            max_search_pages: config.max_search_pages,
            fetch_profile_in_discovery: config.fetch_profile_in_discovery,
            stale_creator_days: config.stale_creator_days,
            parallel_workers: config.parallel_workers.max(1),
            download_concurrency: config.download_concurrency.max(1),
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
        }
    }
}

/// Everything the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub trends: Arc<dyn TrendSource>,
    pub videos: Arc<dyn VideoSearch>,
    pub profiles: Arc<dyn ProfileFetcher>,
    pub classifier: Arc<Classifier>,
    pub stores: Arc<dyn StoreSource>,
    /// `None` disables avatar post-processing.
    pub avatars: Option<Arc<dyn AvatarCache>>,
}

/// Which optional phases a run executes.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub roll_call: bool,
    pub cleanup: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            roll_call: true,
            cleanup: true,
        }
    }
}

pub struct DiscoveryEngine {
    pub(crate) config: EngineConfig,
    pub(crate) filter: ContextFilter,
    pub(crate) deps: Collaborators,
    pub(crate) pacing: Pacing,
}

impl DiscoveryEngine {
    #[must_use]
    pub fn new(config: EngineConfig, deps: Collaborators) -> Self {
        let filter = ContextFilter::from_policy(&config.policy);
        let pacing = Pacing::new(config.inter_request_delay);
        Self {
            config,
            filter,
            deps,
            pacing,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs every phase for today's date (UTC).
    pub async fn run(&self, options: RunOptions) -> RunSummary {
        self.run_on(Utc::now().date_naive(), options).await
    }

    /// Runs Discovery, avatar post-processing, Roll Call and Cleanup for
    /// `today`, in that order, each in its own unit of work.
    ///
    /// Phase failures are logged and listed in the summary; a started run
    /// always produces one.
    pub async fn run_on(&self, today: NaiveDate, options: RunOptions) -> RunSummary {
        let mut ctx = RunContext::new(today);
        let span = tracing::info_span!("comet_run", run_id = %ctx.run_id, %today);
        self.run_phases(&mut ctx, options).instrument(span).await
    }

    async fn run_phases(&self, ctx: &mut RunContext, options: RunOptions) -> RunSummary {
        let mut failed_phases = Vec::new();
        tracing::info!(
            workers = self.config.parallel_workers,
            providers = ?self.deps.classifier.provider_names(),
            "run started"
        );

        let trends = match self.discover(ctx).await {
            Ok(trends) => trends,
            Err(e) => {
                tracing::error!(error = %e, "discovery phase failed");
                failed_phases.push("discovery");
                Vec::new()
            }
        };

        let avatars = match self.cache_new_avatars(ctx).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "avatar post-processing failed");
                failed_phases.push("avatars");
                AvatarStats::default()
            }
        };

        let roll_call = if options.roll_call {
            match self.roll_call(ctx).await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::error!(error = %e, "roll call phase failed");
                    failed_phases.push("roll_call");
                    RollCallStats::default()
                }
            }
        } else {
            tracing::info!("roll call skipped");
            RollCallStats::default()
        };

        let evicted = if options.cleanup {
            match self.cleanup(ctx.today, self.config.stale_creator_days).await {
                Ok(count) => count,
                Err(e) => {
                    tracing::error!(error = %e, "cleanup phase failed");
                    failed_phases.push("cleanup");
                    0
                }
            }
        } else {
            tracing::info!("cleanup skipped");
            0
        };

        let summary = RunSummary {
            run_id: ctx.run_id,
            run_date: ctx.today,
            trends,
            trends_committed: ctx.trends_committed,
            trends_failed: ctx.trends_failed,
            discovery: ctx.stats,
            avatars,
            roll_call,
            evicted,
            failed_phases,
        };
        log_summary(&summary);
        summary
    }

    /// Evicts creators with no snapshot in the `stale_days` days up to and
    /// including `today`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the eviction unit fails; nothing is
    /// deleted in that case.
    pub async fn cleanup(&self, today: NaiveDate, stale_days: u32) -> Result<u64, EngineError> {
        let cutoff = today - chrono::Duration::days(i64::from(stale_days));
        let mut store = self.deps.stores.open().await?;
        store.begin_phase().await?;
        let evicted = match store.evict_stale(cutoff).await {
            Ok(evicted) => evicted,
            Err(e) => {
                abort_quietly(store.as_mut(), "cleanup").await;
                return Err(e.into());
            }
        };
        store.commit_phase().await?;

        if evicted.is_empty() {
            tracing::info!(%cutoff, "no stale creators");
        } else {
            let sample: Vec<&str> = evicted.iter().take(10).map(|c| c.handle.as_str()).collect();
            tracing::info!(%cutoff, evicted = evicted.len(), ?sample, "evicted stale creators");
        }
        Ok(evicted.len() as u64)
    }

    /// Caches the avatars of creators persisted during Discovery and writes
    /// back every URL that changed.
    async fn cache_new_avatars(&self, ctx: &RunContext) -> Result<AvatarStats, EngineError> {
        if self.deps.avatars.is_none() || ctx.new_avatars.is_empty() {
            return Ok(AvatarStats::default());
        }
        let pending: Vec<(String, String)> = ctx
            .new_avatars
            .iter()
            .map(|(user_id, url)| (user_id.clone(), url.clone()))
            .collect();
        self.cache_avatars(pending).await
    }

    /// Re-caches every roster avatar that is not yet in permanent storage.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the roster cannot be read or the
    /// write-back unit fails.
    pub async fn backfill_avatars(&self) -> Result<AvatarStats, EngineError> {
        if self.deps.avatars.is_none() {
            return Ok(AvatarStats::default());
        }
        let mut store = self.deps.stores.open().await?;
        store.begin_phase().await?;
        let roster = store.list_roster().await;
        abort_quietly(store.as_mut(), "avatar backfill").await;

        let pending: Vec<(String, String)> = roster?
            .into_iter()
            .filter_map(|entry| {
                entry
                    .avatar_url
                    .filter(|url| !url.is_empty())
                    .map(|url| (entry.user_id, url))
            })
            .collect();
        tracing::info!(creators = pending.len(), "backfilling avatars");
        self.cache_avatars(pending).await
    }

    async fn cache_avatars(
        &self,
        pending: Vec<(String, String)>,
    ) -> Result<AvatarStats, EngineError> {
        let Some(cache) = self.deps.avatars.as_ref() else {
            return Ok(AvatarStats::default());
        };
        let mut stats = AvatarStats {
            attempted: pending.len() as u64,
            ..AvatarStats::default()
        };

        let results: Vec<(String, String, String)> = stream::iter(pending)
            .map(|(user_id, original)| {
                let cache = Arc::clone(cache);
                async move {
                    let cached = cache.cache(&user_id, &original).await;
                    (user_id, original, cached)
                }
            })
            .buffer_unordered(self.config.download_concurrency)
            .collect()
            .await;

        let changed: HashMap<String, String> = results
            .into_iter()
            .filter_map(|(user_id, original, cached)| {
                (cached != original).then_some((user_id, cached))
            })
            .collect();
        stats.unchanged = stats.attempted - changed.len() as u64;
        if changed.is_empty() {
            return Ok(stats);
        }

        let mut store = self.deps.stores.open().await?;
        store.begin_phase().await?;
        for (user_id, url) in &changed {
            match store.update_avatar(user_id, url).await {
                Ok(true) => stats.cached += 1,
                Ok(false) => {
                    tracing::debug!(user_id = %user_id, "creator gone before avatar write-back");
                    stats.write_failed += 1;
                }
                Err(e) => {
                    abort_quietly(store.as_mut(), "avatars").await;
                    return Err(e.into());
                }
            }
        }
        store.commit_phase().await?;
        tracing::info!(cached = stats.cached, "avatar URLs updated");
        Ok(stats)
    }

}

/// Rolls back the open phase, logging rather than propagating a failure.
pub(crate) async fn abort_quietly(store: &mut dyn RosterStore, phase: &'static str) {
    if let Err(e) = store.abort_phase().await {
        tracing::warn!(phase, error = %e, "rollback failed");
    }
}

fn log_summary(summary: &RunSummary) {
    let d = &summary.discovery;
    tracing::info!(
        trends = summary.trends.len(),
        trends_committed = summary.trends_committed,
        trends_failed = summary.trends_failed,
        processed = d.processed,
        rejected_platform = d.rejected_platform,
        rejected_caption = d.rejected_caption,
        rejected_criteria = d.rejected_criteria,
        rejected_missing_id = d.rejected_missing_id,
        rejected_blacklist = d.rejected_blacklist,
        skipped_evaluated = d.skipped_evaluated,
        rejected_personality = d.rejected_personality,
        passed = d.passed,
        persisted = d.persisted,
        persist_failed = d.persist_failed,
        avatars_cached = summary.avatars.cached,
        roll_call_updated = summary.roll_call.updated,
        roll_call_failed = summary.roll_call.failed,
        roll_call_skipped = summary.roll_call.skipped,
        evicted = summary.evicted,
        "run complete"
    );
    if !summary.failed_phases.is_empty() {
        tracing::warn!(failed_phases = ?summary.failed_phases, "run finished with failed phases");
    }
}
