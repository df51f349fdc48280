//! Phase 2: refresh every roster creator Discovery did not touch.

use comet_core::build_snapshot;
use comet_db::RosterEntry;

use crate::context::RunContext;
use crate::engine::{abort_quietly, DiscoveryEngine};
use crate::error::{EngineError, StoreError};
use crate::stats::RollCallStats;
use crate::store::RosterStore;

impl DiscoveryEngine {
    /// Snapshots every creator not persisted by this run's Discovery.
    ///
    /// Profile failures are counted and skipped. Each snapshot is its own item
    /// unit; the whole phase commits once at the end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the phase unit itself fails; its
    /// snapshots are rolled back in that case.
    pub(crate) async fn roll_call(&self, ctx: &RunContext) -> Result<RollCallStats, EngineError> {
        let mut store = self.deps.stores.open().await?;
        store.begin_phase().await?;

        let mut stats = RollCallStats::default();
        match self.refresh_roster(store.as_mut(), ctx, &mut stats).await {
            Ok(()) => store.commit_phase().await?,
            Err(e) => {
                abort_quietly(store.as_mut(), "roll_call").await;
                return Err(e.into());
            }
        }

        tracing::info!(
            updated = stats.updated,
            failed = stats.failed,
            skipped = stats.skipped,
            "roll call complete"
        );
        Ok(stats)
    }

    async fn refresh_roster(
        &self,
        store: &mut dyn RosterStore,
        ctx: &RunContext,
        stats: &mut RollCallStats,
    ) -> Result<(), StoreError> {
        let roster = store.list_roster().await?;
        let total = roster.len();
        let pending: Vec<RosterEntry> = roster
            .into_iter()
            .filter(|entry| !ctx.discovered.contains(&entry.user_id))
            .collect();
        stats.skipped = (total - pending.len()) as u64;
        tracing::info!(creators = pending.len(), skipped = stats.skipped, "roll call started");

        for entry in &pending {
            self.pacing.profiles.wait().await;
            let profile = match self.deps.profiles.fetch_profile(&entry.handle).await {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    stats.failed += 1;
                    tracing::debug!(handle = %entry.handle, "profile unavailable");
                    continue;
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(handle = %entry.handle, error = %e, "profile fetch failed");
                    continue;
                }
            };

            let mut counts = profile;
            counts.user_id.clone_from(&entry.user_id);

            store.begin_item().await?;
            let saved = async {
                let prior = store.prior_snapshot(&entry.user_id, ctx.today).await?;
                let snapshot = build_snapshot(&counts, prior.as_ref(), ctx.today, None);
                store.upsert_snapshot(&snapshot).await
            }
            .await;
            match saved {
                Ok(()) => {
                    store.commit_item().await?;
                    stats.updated += 1;
                }
                Err(e) => {
                    store.abort_item().await?;
                    stats.failed += 1;
                    tracing::warn!(handle = %entry.handle, error = %e, "snapshot failed");
                }
            }
        }
        Ok(())
    }
}
