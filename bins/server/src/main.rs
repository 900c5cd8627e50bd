//! Tally API Server
//!
//! Main entry point for the wallet ledger service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::wallet::{MokaCacheBackend, ReadCache, WalletService, WalletServiceConfig};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_db::{SeaOrmLedgerStore, connect};
use tally_shared::{AppConfig, CacheConfig};

fn build_cache(config: &CacheConfig) -> ReadCache {
    if !config.enabled {
        warn!("Read cache disabled");
        return ReadCache::disabled();
    }

    info!(
        ttl_secs = config.ttl_secs,
        max_capacity = config.max_capacity,
        invalidate_on_write = config.invalidate_on_write,
        "Read cache configured"
    );
    ReadCache::new(
        Arc::new(MokaCacheBackend::new(config.max_capacity)),
        Duration::from_secs(config.ttl_secs),
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    if config.database.run_migrations {
        Migrator::up(&db, None)
            .await
            .context("Failed to apply migrations")?;
        info!("Migrations applied");
    }

    // Create wallet engine
    let store = Arc::new(SeaOrmLedgerStore::new(db.clone()));
    let wallets = WalletService::new(
        store,
        build_cache(&config.cache),
        WalletServiceConfig {
            invalidate_on_write: config.cache.invalidate_on_write,
            operation_timeout: Some(config.server.operation_timeout()),
        },
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        wallets: Arc::new(wallets),
    };

    // Create router
    let app = create_router(state, config.server.http_timeout());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
