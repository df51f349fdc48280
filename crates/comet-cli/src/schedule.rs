//! Recurring runs via `tokio-cron-scheduler`.

use std::sync::Arc;

use comet_core::AppConfig;
use comet_discovery::{DiscoveryEngine, RunOptions};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::pipeline;

/// Registers the full run on `cron` and blocks until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the engine cannot be built, the cron expression is
/// invalid, or the scheduler fails to start or stop.
pub(crate) async fn run_scheduled(config: AppConfig, pool: PgPool, cron: &str) -> anyhow::Result<()> {
    let engine = Arc::new(pipeline::build_engine(&config, pool, None).await?);

    let mut scheduler = JobScheduler::new().await?;
    register_run_job(&scheduler, engine, cron).await?;
    scheduler.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("scheduler: shutting down");
    scheduler.shutdown().await?;
    Ok(())
}

async fn register_run_job(
    scheduler: &JobScheduler,
    engine: Arc<DiscoveryEngine>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let engine = Arc::clone(&engine);

        Box::pin(async move {
            tracing::info!("scheduler: starting comet run");
            let summary = engine.run(RunOptions::default()).await;
            tracing::info!(
                run_id = %summary.run_id,
                creators = summary.creators_touched(),
                evicted = summary.evicted,
                "scheduler: comet run complete"
            );
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron = %cron, "scheduler: registered comet run job");
    Ok(())
}
