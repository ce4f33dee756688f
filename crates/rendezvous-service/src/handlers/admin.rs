//! Admin handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use rendezvous_core::{RefundDecision, RefundRequestId, RefundStatus};

use crate::auth::{AdminUser, AuthUser};
use crate::error::ApiError;
use crate::events::ExpirySummary;
use crate::handlers::parse_id;
use crate::handlers::refunds::ListRefundRequestsResponse;
use crate::refunds::ReviewOutcome;
use crate::state::AppState;

/// Refund queue filter.
#[derive(Debug, Deserialize)]
pub struct RefundQueueQuery {
    /// Only requests in this status.
    #[serde(default)]
    pub status: Option<RefundStatus>,
}

/// List refund requests for review.
pub async fn list_refunds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<RefundQueueQuery>,
) -> Result<Json<ListRefundRequestsResponse>, ApiError> {
    let refund_requests = state.db.transaction(|tx| {
        state
            .refunds
            .requests_by_status(tx, &auth.actor(), query.status)
    })?;

    Ok(Json(ListRefundRequestsResponse { refund_requests }))
}

/// Review request.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// `approved` or `rejected`.
    pub decision: RefundDecision,
    /// Notes kept on the request.
    #[serde(default)]
    pub admin_notes: Option<String>,
}

/// Decide a pending refund request.
pub async fn review_refund(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(request_id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> Result<Json<ReviewOutcome>, ApiError> {
    let request_id: RefundRequestId = parse_id(&request_id)?;
    let outcome = state.db.transaction(|tx| {
        state.refunds.review(
            tx,
            &auth.actor(),
            request_id,
            request.decision,
            request.admin_notes,
            Utc::now(),
        )
    })?;

    Ok(Json(outcome))
}

/// Expire every event that has ended.
pub async fn expire_events(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<ExpirySummary>, ApiError> {
    let summary = state
        .db
        .transaction(|tx| state.events.expire_due(tx, Utc::now()))?;

    tracing::info!(
        admin_id = %admin.user_id,
        events_expired = summary.events_expired,
        credits_released = summary.credits_released,
        "Manual expiry sweep"
    );

    Ok(Json(summary))
}
