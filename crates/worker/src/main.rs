use std::sync::Arc;

use courier_common::config::AppConfig;
use courier_common::db;
use courier_common::shutdown::{self, ShutdownTrigger};
use courier_store::PgNotificationStore;
use courier_worker::{Worker, build_registry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_worker=info,courier_store=info".into()),
        )
        .json()
        .init();

    tracing::info!("Courier worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    // The live feed pins one connection for its whole lifetime.
    if config.db_max_connections < 2 {
        anyhow::bail!("DB_MAX_CONNECTIONS must be at least 2 for the worker");
    }

    // Connect to database
    let pool = db::create_pool(
        &config.database_url,
        config.db_min_connections,
        config.db_max_connections,
    )
    .await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let registry = build_registry(&config)?;
    let store = Arc::new(PgNotificationStore::new(pool));

    let (trigger, shutdown) = shutdown::channel();
    tokio::spawn(forward_signals(trigger));

    let worker = Worker::new(store, registry, config.worker_queue_capacity);
    match worker.run(shutdown).await {
        Ok(stats) => {
            tracing::info!(processed = stats.processed(), "Courier worker stopped.");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Courier worker exited with error");
            Err(e.into())
        }
    }
}

/// Trigger shutdown on Ctrl+C or SIGTERM.
async fn forward_signals(trigger: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Received shutdown signal, stopping gracefully...");
    trigger.trigger();
}
