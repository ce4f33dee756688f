//! Credit balance, hold and transaction handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use rendezvous_core::{
    ApplicationId, CreditBalance, CreditHold, CreditTransaction, EventId, Sufficiency,
};

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::handlers::accounts::AccountResponse;
use crate::ledger::{DeductOutcome, HoldOutcome, ReleaseOutcome};
use crate::state::AppState;

/// Get current credit balance.
///
/// A user without an account reads as all zeros.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CreditBalance>, ApiError> {
    let balance = state
        .db
        .transaction(|tx| state.ledger.balance(tx, auth.user_id))?;

    Ok(Json(balance))
}

/// Sufficiency query parameters.
#[derive(Debug, Deserialize)]
pub struct SufficientQuery {
    /// Credits the caller wants to spend.
    pub required: u32,
}

/// Check whether the available balance covers `required`.
pub async fn check_sufficient(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<SufficientQuery>,
) -> Result<Json<Sufficiency>, ApiError> {
    let sufficiency = state
        .db
        .transaction(|tx| state.ledger.sufficient_for(tx, auth.user_id, query.required))?;

    Ok(Json(sufficiency))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Transaction type.
    pub transaction_type: String,
    /// Signed amount (negative = debit).
    pub amount: i64,
    /// Related event, if any.
    pub related_event_id: Option<String>,
    /// Related application, if any.
    pub related_application_id: Option<String>,
    /// Description.
    pub description: String,
    /// Available balance after this transaction.
    pub available_after: u32,
    /// Held balance after this transaction.
    pub held_after: u32,
    /// Timestamp.
    pub timestamp: String,
}

impl From<&CreditTransaction> for TransactionResponse {
    fn from(tx: &CreditTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            transaction_type: tx.transaction_type.as_str().to_string(),
            amount: tx.amount,
            related_event_id: tx.related_event_id.map(|id| id.to_string()),
            related_application_id: tx.related_application_id.map(|id| id.to_string()),
            description: tx.description.clone(),
            available_after: tx.available_after,
            held_after: tx.held_after,
            timestamp: tx.timestamp.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let transactions = state.db.transaction(|tx| {
        state
            .ledger
            .transactions(tx, auth.user_id, limit + 1, query.offset)
    })?;

    let has_more = transactions.len() > limit;
    let transactions = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// List holds response.
#[derive(Debug, Serialize)]
pub struct ListHoldsResponse {
    /// Holds (newest first), active and released.
    pub holds: Vec<CreditHold>,
}

/// List the caller's holds.
pub async fn list_holds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListHoldsResponse>, ApiError> {
    let holds = state
        .db
        .transaction(|tx| state.ledger.holds(tx, auth.user_id))?;

    Ok(Json(ListHoldsResponse { holds }))
}

/// Hold request.
#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    /// Event the credits are reserved for.
    pub event_id: EventId,
    /// Credits to reserve.
    pub max_guests: u32,
    /// Title used in the ledger description.
    #[serde(default)]
    pub event_title: Option<String>,
}

/// Reserve credits for an event.
pub async fn hold(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<HoldRequest>,
) -> Result<Json<HoldOutcome>, ApiError> {
    let outcome = state.db.transaction(|tx| {
        state.ledger.hold(
            tx,
            auth.user_id,
            request.event_id,
            request.max_guests,
            request.event_title.as_deref(),
        )
    })?;

    Ok(Json(outcome))
}

/// Deduct request.
#[derive(Debug, Deserialize)]
pub struct DeductRequest {
    /// Event whose hold is consumed.
    pub event_id: EventId,
    /// Application the credit is spent on.
    pub application_id: ApplicationId,
}

/// Consume one held credit.
pub async fn deduct(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<DeductRequest>,
) -> Result<Json<DeductOutcome>, ApiError> {
    let outcome = state.db.transaction(|tx| {
        state
            .ledger
            .deduct(tx, auth.user_id, request.event_id, request.application_id)
    })?;

    Ok(Json(outcome))
}

/// Release request.
#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    /// Event whose hold is released.
    pub event_id: EventId,
    /// Description for the ledger entry.
    #[serde(default)]
    pub description: Option<String>,
    /// Fail when there is no active hold (default: true).
    #[serde(default = "default_throw")]
    pub throw_on_missing_hold: bool,
}

fn default_throw() -> bool {
    true
}

/// Return unused held credits.
pub async fn release(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<ReleaseRequest>,
) -> Result<Json<ReleaseOutcome>, ApiError> {
    let outcome = state.db.transaction(|tx| {
        state.ledger.release(
            tx,
            auth.user_id,
            request.event_id,
            request.description.as_deref(),
            request.throw_on_missing_hold,
        )
    })?;

    Ok(Json(outcome))
}

/// Purchase credit request, sent by the payment processor.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// User the credits are for.
    pub user_id: rendezvous_core::UserId,
    /// Credits bought.
    pub credits: u32,
    /// Payment gateway reference. Crediting twice is rejected.
    pub payment_transaction_id: String,
    /// Description for the ledger entry.
    #[serde(default)]
    pub description: Option<String>,
}

/// Credit a completed purchase (service auth).
pub async fn record_purchase(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    tracing::info!(
        service = %service.service_name,
        user_id = %request.user_id,
        credits = request.credits,
        "Recording credit purchase"
    );

    let account = state.db.transaction(|tx| {
        state.ledger.purchase(
            tx,
            request.user_id,
            request.credits,
            &request.payment_transaction_id,
            request.description.as_deref(),
        )
    })?;

    Ok(Json(AccountResponse::from(&account)))
}
