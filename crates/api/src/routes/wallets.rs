//! Wallet, top-up and transfer routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_core::wallet::{LedgerEntry, SenderView, Wallet, WalletError};
use tally_shared::UserId;
use tracing::{error, info};

use crate::AppState;

/// Creates the wallet routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/wallets", post(create_wallet))
        .route("/wallets/{user_id}", get(get_wallet))
        .route("/wallets/{user_id}/top-up", post(top_up))
        .route("/wallets/{user_id}/transactions", get(list_transactions))
        .route("/transfers", post(transfer))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a wallet.
#[derive(Debug, Deserialize)]
pub struct CreateWalletRequest {
    /// Owner of the new wallet.
    pub user_id: i64,
}

/// Request body for a top-up.
#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    /// Amount to credit, as a decimal string or number.
    pub amount: Decimal,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Sending user.
    pub from_user_id: i64,
    /// Receiving user.
    pub to_user_id: i64,
    /// Amount to move.
    pub amount: Decimal,
}

/// Response for a wallet.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// Wallet ID.
    pub id: i64,
    /// Owning user.
    pub user_id: i64,
    /// Current balance.
    pub balance: Decimal,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            id: wallet.id.into_inner(),
            user_id: wallet.user_id.into_inner(),
            balance: wallet.balance,
        }
    }
}

/// Response for the sender side of a transfer.
#[derive(Debug, Serialize)]
pub struct SenderResponse {
    /// Sending user.
    pub user_id: i64,
    /// Sender balance after the transfer.
    pub balance: Decimal,
}

impl From<SenderView> for SenderResponse {
    fn from(view: SenderView) -> Self {
        Self {
            user_id: view.user_id.into_inner(),
            balance: view.balance,
        }
    }
}

/// Response for one ledger entry.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Entry ID.
    pub id: i64,
    /// Owner of the entry.
    pub user_id: i64,
    /// Receiving user of a transfer.
    pub counterparty_user_id: Option<i64>,
    /// `top_up` or `transfer`.
    pub transaction_type: &'static str,
    /// Amount of the operation.
    pub amount: Decimal,
    /// Commit time (RFC 3339).
    pub created_at: String,
}

impl From<LedgerEntry> for TransactionResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id.into_inner(),
            user_id: entry.user_id.into_inner(),
            counterparty_user_id: entry.counterparty_user_id.map(UserId::into_inner),
            transaction_type: entry.transaction_type.as_str(),
            amount: entry.amount,
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Body of the wallet routes: `{"wallet": {...}}`.
#[derive(Debug, Serialize)]
pub struct WalletEnvelope {
    /// The wallet.
    pub wallet: WalletResponse,
}

/// Body of a successful transfer: the sender only.
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    /// Sender after the transfer.
    pub wallet: SenderResponse,
}

/// Body of the transaction listing.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    /// Entries in ascending id order.
    pub transactions: Vec<TransactionResponse>,
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable error code.
    pub error: &'static str,
    /// Human readable message.
    pub message: String,
}

impl From<Wallet> for WalletEnvelope {
    fn from(wallet: Wallet) -> Self {
        Self {
            wallet: wallet.into(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/wallets` - Create an empty wallet.
async fn create_wallet(
    State(state): State<AppState>,
    Json(payload): Json<CreateWalletRequest>,
) -> Response {
    match state.wallets.create_wallet(UserId(payload.user_id)).await {
        Ok(wallet) => {
            info!(user_id = payload.user_id, "Wallet created");
            (StatusCode::CREATED, Json(WalletEnvelope::from(wallet))).into_response()
        }
        Err(e) => wallet_error_response(&e),
    }
}

/// GET `/wallets/{user_id}` - Get a wallet.
async fn get_wallet(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match state.wallets.get_wallet(UserId(user_id)).await {
        Ok(wallet) => (StatusCode::OK, Json(WalletEnvelope::from(wallet))).into_response(),
        Err(e) => wallet_error_response(&e),
    }
}

/// POST `/wallets/{user_id}/top-up` - Credit a wallet.
async fn top_up(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<TopUpRequest>,
) -> Response {
    match state.wallets.top_up(UserId(user_id), payload.amount).await {
        Ok(wallet) => (StatusCode::OK, Json(WalletEnvelope::from(wallet))).into_response(),
        Err(e) => wallet_error_response(&e),
    }
}

/// POST `/transfers` - Move funds between two wallets.
async fn transfer(State(state): State<AppState>, Json(payload): Json<TransferRequest>) -> Response {
    let result = state
        .wallets
        .transfer(
            UserId(payload.from_user_id),
            UserId(payload.to_user_id),
            payload.amount,
        )
        .await;

    match result {
        Ok(sender) => {
            let body = TransferResponse {
                wallet: sender.into(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => wallet_error_response(&e),
    }
}

/// GET `/wallets/{user_id}/transactions` - List a user's ledger entries.
async fn list_transactions(State(state): State<AppState>, Path(user_id): Path<i64>) -> Response {
    match state.wallets.get_transactions(UserId(user_id)).await {
        Ok(entries) => {
            let body = TransactionListResponse {
                transactions: entries.into_iter().map(TransactionResponse::from).collect(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => wallet_error_response(&e),
    }
}

fn wallet_error_response(e: &WalletError) -> Response {
    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = match e {
        WalletError::StoreFailure(_) => {
            error!(error = %e, "Wallet operation failed");
            "An error occurred".to_string()
        }
        WalletError::Cancelled => {
            error!(error = %e, "Wallet operation cancelled");
            e.to_string()
        }
        _ => e.to_string(),
    };

    let body = ErrorResponse {
        error: e.error_code(),
        message,
    };
    (status, Json(body)).into_response()
}
