//! Refund request handlers for event owners.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use rendezvous_core::{RefundRequest, RefundRequestId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::refunds::RefundClaim;
use crate::state::AppState;

/// Submit response.
#[derive(Debug, Serialize)]
pub struct SubmitRefundResponse {
    /// The new request.
    pub refund_request_id: RefundRequestId,
}

/// Ask for the credit spent on a no-show participant.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(claim): Json<RefundClaim>,
) -> Result<Json<SubmitRefundResponse>, ApiError> {
    let request = state
        .db
        .transaction(|tx| state.refunds.submit(tx, auth.user_id, claim, Utc::now()))?;

    Ok(Json(SubmitRefundResponse {
        refund_request_id: request.id,
    }))
}

/// List refund requests response.
#[derive(Debug, Serialize)]
pub struct ListRefundRequestsResponse {
    /// Requests, newest first.
    pub refund_requests: Vec<RefundRequest>,
}

/// List the caller's refund requests.
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListRefundRequestsResponse>, ApiError> {
    let refund_requests = state
        .db
        .transaction(|tx| state.refunds.requests_for_user(tx, auth.user_id))?;

    Ok(Json(ListRefundRequestsResponse { refund_requests }))
}
