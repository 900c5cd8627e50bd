//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for wallets, top-ups and transfers
//! - Request and response types
//! - Mapping from engine errors to HTTP responses

pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use sea_orm::DatabaseConnection;
use tally_core::wallet::WalletService;
use tally_db::SeaOrmLedgerStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Wallet engine over the database store.
pub type Wallets = WalletService<SeaOrmLedgerStore>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Wallet ledger engine.
    pub wallets: Arc<Wallets>,
}

/// Creates the main application router.
///
/// Requests running longer than `request_timeout` are answered with
/// `504 Gateway Timeout`. Pass a bound longer than the engine's operation
/// deadline so the layer never drops a handler that is committing.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
