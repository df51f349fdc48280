use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod pipeline;
mod schedule;

#[derive(Debug, Parser)]
#[command(name = "comet-cli")]
#[command(about = "Comet creator discovery and growth tracking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run Discovery, Roll Call and Cleanup once
    Run {
        /// Trend worker pool size (overrides `COMET_PARALLEL_WORKERS`)
        #[arg(long)]
        workers: Option<usize>,

        #[arg(long)]
        skip_roll_call: bool,

        #[arg(long)]
        skip_cleanup: bool,
    },
    /// Print the trends Discovery would select today, without writing
    Trends,
    /// Evict creators without a recent snapshot
    Cleanup {
        /// Stale window in days (overrides `COMET_STALE_CREATOR_DAYS`)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run the full pipeline on a cron schedule until interrupted
    Schedule {
        /// Six-field cron expression (seconds first), UTC
        #[arg(long, default_value = "0 0 6 * * *")]
        cron: String,
    },
    /// Avatar storage utilities
    Avatars {
        #[command(subcommand)]
        command: AvatarCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[derive(Debug, Subcommand)]
enum AvatarCommands {
    /// Copy every roster avatar not yet in permanent storage
    Backfill,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("comet-cli ready; see --help");
        return Ok(());
    };

    let config = comet_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = comet_db::PoolConfig::from_app_config(&config);
    let pool = comet_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            comet_db::ping(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = comet_db::run_migrations(&pool).await?;
            println!("migrations applied: {applied}");
        }
        Commands::Run {
            workers,
            skip_roll_call,
            skip_cleanup,
        } => {
            comet_db::run_migrations(&pool).await?;
            let options = comet_discovery::RunOptions {
                roll_call: !skip_roll_call,
                cleanup: !skip_cleanup,
            };
            pipeline::run_once(&config, pool, workers, options).await?;
        }
        Commands::Trends => pipeline::preview_trends(&config, pool).await?,
        Commands::Cleanup { days } => {
            comet_db::run_migrations(&pool).await?;
            pipeline::cleanup(&config, pool, days).await?;
        }
        Commands::Schedule { cron } => {
            comet_db::run_migrations(&pool).await?;
            schedule::run_scheduled(config, pool, &cron).await?;
        }
        Commands::Avatars {
            command: AvatarCommands::Backfill,
        } => pipeline::backfill_avatars(&config, pool).await?,
    }

    Ok(())
}
