mod api;
mod middleware;
mod runs;
mod scheduler;

use std::sync::Arc;

use presswatch_feeds::FeedFetcher;
use presswatch_pipeline::{EventBus, PgMentionStore, StatusHandle, VerifierDeps};
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(presswatch_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = presswatch_db::PoolConfig::from_app_config(&config);
    let pool = presswatch_db::connect_pool(&config.database_url, pool_config).await?;
    presswatch_db::run_migrations(&pool).await?;

    let rules = Arc::new(presswatch_core::load_rules(&config.rules_path)?);
    let deps = VerifierDeps::from_config(&config, rules)?;
    if deps.launcher.is_none() {
        tracing::warn!("PRESSWATCH_BROWSERLESS_URL not set; blocked pages will need review");
    }
    let fetcher = FeedFetcher::with_defaults()?;

    let state = AppState {
        store: Arc::new(PgMentionStore::new(pool.clone())),
        deps: Arc::new(deps),
        fetcher: Arc::new(fetcher),
        status: StatusHandle::new(EventBus::new()),
        pool: Some(pool),
    };

    let _scheduler = scheduler::build_scheduler(state.clone()).await?;

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "presswatch-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
