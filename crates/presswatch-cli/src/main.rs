mod maintenance;
mod verify;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "presswatch-cli")]
#[command(about = "Media mention verification and maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Verify every stored mention that is not yet confirmed
    Verify,
    /// Poll every client's alert feed and record new mentions
    PollFeeds {
        /// Record mentions without running a verification pass afterwards
        #[arg(long)]
        no_verify: bool,
    },
    /// Re-clean stored snippets with the current cleaning rules
    CleanSnippets,
    /// Recompute canonical links and delete duplicate mentions
    Dedupe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("presswatch-cli: no command given (try --help)");
        return Ok(());
    };

    let config = presswatch_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = presswatch_db::PoolConfig::from_app_config(&config);
    let pool = presswatch_db::connect_pool(&config.database_url, pool_config).await?;
    presswatch_db::run_migrations(&pool).await?;

    match command {
        Commands::Verify => {
            let rules = Arc::new(presswatch_core::load_rules(&config.rules_path)?);
            verify::run_verify(pool, &config, rules).await?;
        }
        Commands::PollFeeds { no_verify } => {
            let rules = Arc::new(presswatch_core::load_rules(&config.rules_path)?);
            verify::run_poll_feeds(pool, &config, rules, !no_verify).await?;
        }
        Commands::CleanSnippets => maintenance::run_clean_snippets(&pool).await?,
        Commands::Dedupe => maintenance::run_dedupe(&pool).await?,
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
