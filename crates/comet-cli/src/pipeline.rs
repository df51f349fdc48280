//! Engine assembly and the one-shot command handlers.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use comet_classifier::Classifier;
use comet_core::AppConfig;
use comet_discovery::{
    AvatarCache, Collaborators, DiscoveryEngine, EngineConfig, PgStoreSource, RunOptions,
    RunSummary, SupabaseAvatarStore,
};
use comet_tikhub::{SearchOptions, TikHubClient};
use sqlx::PgPool;

/// Wires the production collaborators into an engine.
///
/// `workers` overrides the configured trend worker pool size.
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be constructed.
pub(crate) async fn build_engine(
    config: &AppConfig,
    pool: PgPool,
    workers: Option<usize>,
) -> anyhow::Result<DiscoveryEngine> {
    let tikhub = TikHubClient::with_base_url(
        &config.tikhub_api_key,
        config.request_timeout_secs,
        &config.tikhub_base_url,
    )
    .context("failed to build TikHub client")?
    .with_search_options(SearchOptions {
        publish_time_days: config.publish_time_days,
        sort_type: 0,
        page_size: config.search_page_size,
    })
    .with_retry(config.max_retries, config.retry_backoff_base_ms);
    let tikhub = Arc::new(tikhub);

    let classifier =
        Classifier::from_app_config(config).context("failed to build AI providers")?;

    let avatars: Option<Arc<dyn AvatarCache>> = match &config.storage {
        Some(storage) => {
            let store = SupabaseAvatarStore::new(
                storage,
                config.download_concurrency,
                config.request_timeout_secs,
            )
            .context("failed to build avatar store")?;
            if let Err(e) = store.ensure_bucket().await {
                tracing::warn!(error = %e, "could not verify avatar bucket");
            }
            Some(Arc::new(store))
        }
        None => {
            tracing::info!("avatar storage not configured; avatar caching disabled");
            None
        }
    };

    let mut engine_config = EngineConfig::from_app_config(config);
    if let Some(workers) = workers {
        engine_config.parallel_workers = workers.max(1);
    }

    let deps = Collaborators {
        trends: tikhub.clone(),
        videos: tikhub.clone(),
        profiles: tikhub,
        classifier: Arc::new(classifier),
        stores: Arc::new(PgStoreSource::new(pool)),
        avatars,
    };
    Ok(DiscoveryEngine::new(engine_config, deps))
}

pub(crate) async fn run_once(
    config: &AppConfig,
    pool: PgPool,
    workers: Option<usize>,
    options: RunOptions,
) -> anyhow::Result<()> {
    let engine = build_engine(config, pool, workers).await?;
    let summary = engine.run(options).await;
    print_summary(&summary)?;
    if !summary.failed_phases.is_empty() {
        anyhow::bail!("run finished with failed phases: {:?}", summary.failed_phases);
    }
    Ok(())
}

pub(crate) async fn preview_trends(config: &AppConfig, pool: PgPool) -> anyhow::Result<()> {
    let engine = build_engine(config, pool, None).await?;
    let trends = engine.select_trends().await;
    if trends.is_empty() {
        println!("no trends selected");
    }
    for (rank, trend) in trends.iter().enumerate() {
        println!("{:>2}. {trend}", rank + 1);
    }
    Ok(())
}

pub(crate) async fn cleanup(
    config: &AppConfig,
    pool: PgPool,
    days: Option<u32>,
) -> anyhow::Result<()> {
    let engine = build_engine(config, pool, None).await?;
    let days = days.unwrap_or(config.stale_creator_days);
    let evicted = engine
        .cleanup(Utc::now().date_naive(), days)
        .await
        .context("cleanup failed")?;
    println!("evicted {evicted} stale creator(s) (window: {days} days)");
    Ok(())
}

pub(crate) async fn backfill_avatars(config: &AppConfig, pool: PgPool) -> anyhow::Result<()> {
    if config.storage.is_none() {
        anyhow::bail!("avatar storage is not configured (SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY)");
    }
    let engine = build_engine(config, pool, None).await?;
    let stats = engine
        .backfill_avatars()
        .await
        .context("avatar backfill failed")?;
    println!(
        "avatars: {} attempted, {} cached, {} unchanged, {} write failures",
        stats.attempted, stats.cached, stats.unchanged, stats.write_failed
    );
    Ok(())
}

pub(crate) fn print_summary(summary: &RunSummary) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(summary).context("failed to render summary")?;
    println!("{rendered}");
    Ok(())
}
