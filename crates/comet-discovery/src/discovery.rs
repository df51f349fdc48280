//! Phase 1: trends -> search -> filters -> persistence.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use comet_core::{
    apply_trend_blacklist, build_snapshot, normalize_trends, AccountProfile, CandidateVideo,
    CreatorIdentity, FilterLayer, FilterVerdict, Provenance,
};
use futures::stream::{self, StreamExt};

use crate::context::{PersistedCreator, RunContext, TrendWork};
use crate::engine::{abort_quietly, DiscoveryEngine};
use crate::error::{EngineError, StoreError};
use crate::store::RosterStore;

impl DiscoveryEngine {
    /// Fetches, normalizes, blacklists and classifies trending keywords, and
    /// returns the top ones in rank order. Writes nothing.
    pub async fn select_trends(&self) -> Vec<String> {
        self.pacing.trends.wait().await;
        let raw = match self
            .deps
            .trends
            .fetch_trending(self.config.trend_fetch_limit, &self.config.trend_region)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "trending keywords unavailable");
                return Vec::new();
            }
        };

        let normalized = normalize_trends(&raw);
        let before_blacklist = normalized.len();
        let allowed = apply_trend_blacklist(normalized, &self.config.policy.trend_blacklist);
        tracing::info!(
            fetched = raw.len(),
            normalized = before_blacklist,
            blacklisted = before_blacklist - allowed.len(),
            "trends normalized"
        );
        if allowed.is_empty() {
            return Vec::new();
        }

        if self.deps.classifier.has_providers() {
            self.pacing.classifier.wait().await;
        }
        let verdict = self.deps.classifier.classify_relevance(&allowed).await;
        let mut relevant = verdict.kept;
        relevant.truncate(self.config.top_trends);
        tracing::info!(selected = ?relevant, reason = %verdict.reason, "trends selected");
        relevant
    }

    /// Runs the Discovery phase and returns the trends it processed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] only if the trend records cannot be
    /// committed. Failures inside a trend roll back that trend alone.
    pub(crate) async fn discover(&self, ctx: &mut RunContext) -> Result<Vec<String>, EngineError> {
        let trends = self.select_trends().await;
        if trends.is_empty() {
            tracing::info!("no trends to process, discovery ends early");
            return Ok(trends);
        }

        self.record_trends(ctx, &trends).await?;

        if self.config.parallel_workers > 1 {
            let snapshot = ctx.evaluated.clone();
            let today = ctx.today;
            let outcomes: Vec<TrendWork> = stream::iter(trends.iter().cloned())
                .map(|trend| {
                    let evaluated = snapshot.clone();
                    async move { self.run_trend(trend, evaluated, today).await }
                })
                .buffer_unordered(self.config.parallel_workers)
                .collect()
                .await;
            for work in outcomes {
                ctx.absorb(work);
            }
        } else {
            for trend in &trends {
                let evaluated = std::mem::take(&mut ctx.evaluated);
                let work = self.run_trend(trend.clone(), evaluated, ctx.today).await;
                ctx.absorb(work);
            }
        }

        Ok(trends)
    }

    async fn record_trends(&self, ctx: &RunContext, trends: &[String]) -> Result<(), EngineError> {
        let ranked: Vec<(String, i32)> = trends
            .iter()
            .zip(1..)
            .map(|(keyword, rank)| (keyword.clone(), rank))
            .collect();

        let mut store = self.deps.stores.open().await?;
        store.begin_phase().await?;
        if let Err(e) = store.upsert_trends(ctx.today, &ranked).await {
            abort_quietly(store.as_mut(), "trends").await;
            return Err(e.into());
        }
        store.commit_phase().await?;
        tracing::info!(count = ranked.len(), "trend records saved");
        Ok(())
    }

    /// Processes one trend inside its own phase unit.
    async fn run_trend(
        &self,
        trend: String,
        evaluated: HashSet<String>,
        today: NaiveDate,
    ) -> TrendWork {
        let mut work = TrendWork::new(trend, evaluated);
        let mut store = match self.deps.stores.open().await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(trend = %work.trend, error = %e, "could not open store for trend");
                return work;
            }
        };

        let result = async {
            store.begin_phase().await?;
            self.search_trend(store.as_mut(), &mut work, today).await?;
            store.commit_phase().await
        }
        .await;

        match result {
            Ok(()) => {
                work.committed = true;
                tracing::info!(
                    trend = %work.trend,
                    processed = work.stats.processed,
                    persisted = work.stats.persisted,
                    "trend committed"
                );
            }
            Err(e) => {
                abort_quietly(store.as_mut(), "discovery").await;
                tracing::error!(trend = %work.trend, error = %e, "trend rolled back");
            }
        }
        work
    }

    async fn search_trend(
        &self,
        store: &mut dyn RosterStore,
        work: &mut TrendWork,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let mut cursor = 0;
        for page_no in 0..self.config.max_search_pages {
            self.pacing.search.wait().await;
            let page = match self.deps.videos.search(&work.trend, cursor).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(trend = %work.trend, page = page_no, error = %e, "search failed");
                    break;
                }
            };
            tracing::debug!(
                trend = %work.trend,
                page = page_no,
                items = page.items.len(),
                has_more = page.has_more,
                "search page"
            );
            if page.items.is_empty() {
                break;
            }
            for item in &page.items {
                self.process_item(store, work, item, today).await?;
            }
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }
        Ok(())
    }

    /// Applies every gate to one search result and persists survivors.
    ///
    /// Only failures that leave the phase unit unusable are returned.
    async fn process_item(
        &self,
        store: &mut dyn RosterStore,
        work: &mut TrendWork,
        item: &CandidateVideo,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let author = &item.author;
        work.stats.processed += 1;

        if let FilterVerdict::Rejected { layer, reason } = self.filter.check(author, &item.caption)
        {
            match layer {
                FilterLayer::Platform => work.stats.rejected_platform += 1,
                FilterLayer::Caption => work.stats.rejected_caption += 1,
            }
            tracing::debug!(handle = %author.handle, layer = layer.number(), %reason, "filtered");
            return Ok(());
        }
        if !self
            .config
            .criteria
            .admits(author.follower_count, item.play_count)
        {
            work.stats.rejected_criteria += 1;
            return Ok(());
        }
        if author.user_id.is_empty() {
            work.stats.rejected_missing_id += 1;
            return Ok(());
        }
        if let Some(term) = self.config.policy.blacklisted_handle_term(&author.handle) {
            work.stats.rejected_blacklist += 1;
            tracing::debug!(handle = %author.handle, term, "blacklisted handle");
            return Ok(());
        }
        if !work.evaluated.insert(author.user_id.clone()) {
            work.stats.skipped_evaluated += 1;
            return Ok(());
        }

        let classifier = &self.deps.classifier;
        if classifier.personality_check_enabled() && classifier.has_providers() {
            self.pacing.classifier.wait().await;
        }
        let verdict = classifier
            .classify_personality(&author.handle, &author.nickname, &author.signature)
            .await;
        if !verdict.accepted {
            work.stats.rejected_personality += 1;
            tracing::debug!(handle = %author.handle, reason = %verdict.reason, "personality rejected");
            return Ok(());
        }
        work.stats.passed += 1;

        let counts = self.current_counts(author).await;

        store.begin_item().await?;
        match self
            .persist_candidate(store, author, &counts, item, &work.trend, today)
            .await
        {
            Ok(()) => {
                store.commit_item().await?;
                work.stats.persisted += 1;
                work.persisted.push(PersistedCreator {
                    user_id: author.user_id.clone(),
                    avatar_url: author.avatar_url.clone(),
                });
                tracing::info!(
                    handle = %author.handle,
                    followers = counts.follower_count,
                    plays = item.play_count,
                    trend = %work.trend,
                    "comet persisted"
                );
            }
            Err(e) => {
                store.abort_item().await?;
                work.stats.persist_failed += 1;
                tracing::warn!(handle = %author.handle, error = %e, "persist failed, item skipped");
            }
        }
        Ok(())
    }

    /// Counts come from the full profile when enabled and available.
    async fn current_counts(&self, author: &AccountProfile) -> AccountProfile {
        if !self.config.fetch_profile_in_discovery {
            return author.clone();
        }
        self.pacing.profiles.wait().await;
        let fetched = self.deps.profiles.fetch_profile(&author.handle).await;
        match fetched {
            Ok(Some(mut profile)) => {
                profile.user_id.clone_from(&author.user_id);
                profile
            }
            Ok(None) => author.clone(),
            Err(e) => {
                tracing::warn!(handle = %author.handle, error = %e, "profile fetch failed, using search stats");
                author.clone()
            }
        }
    }

    async fn persist_candidate(
        &self,
        store: &mut dyn RosterStore,
        author: &AccountProfile,
        counts: &AccountProfile,
        item: &CandidateVideo,
        trend: &str,
        today: NaiveDate,
    ) -> Result<(), StoreError> {
        let identity = CreatorIdentity::from_profile(author, Utc::now());
        let provenance = Provenance {
            discovered_via_trend: Some(trend.to_string()),
            breakout_video_id: Some(item.video_id.clone()).filter(|id| !id.is_empty()),
        };
        store.upsert_creator(&identity, &provenance).await?;
        let prior = store.prior_snapshot(&author.user_id, today).await?;
        let snapshot = build_snapshot(counts, prior.as_ref(), today, Some(trend));
        store.upsert_snapshot(&snapshot).await
    }
}
