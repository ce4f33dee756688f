//! Application handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use rendezvous_core::{
    ApplicationDecision, ApplicationId, ChatParticipant, EventApplication, EventId,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Response naming the application an operation touched.
#[derive(Debug, Serialize)]
pub struct ApplicationIdResponse {
    /// Application ID.
    pub application_id: ApplicationId,
}

/// Apply request.
#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    /// Note to the event owner.
    #[serde(default)]
    pub message: Option<String>,
}

/// Apply to join an event.
pub async fn apply(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<String>,
    Json(request): Json<ApplyRequest>,
) -> Result<Json<ApplicationIdResponse>, ApiError> {
    let event_id: EventId = parse_id(&event_id)?;
    let application = state.db.transaction(|tx| {
        state
            .applications
            .apply(tx, auth.user_id, event_id, request.message, Utc::now())
    })?;

    Ok(Json(ApplicationIdResponse {
        application_id: application.id,
    }))
}

/// List applications response.
#[derive(Debug, Serialize)]
pub struct ListApplicationsResponse {
    /// Applications.
    pub applications: Vec<EventApplication>,
}

/// List applications to one of the caller's events, oldest first.
pub async fn list_for_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<ListApplicationsResponse>, ApiError> {
    let event_id: EventId = parse_id(&event_id)?;
    let applications = state.db.transaction(|tx| {
        state
            .applications
            .applications_for_event(tx, auth.user_id, event_id)
    })?;

    Ok(Json(ListApplicationsResponse { applications }))
}

/// List the caller's own applications, newest first.
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListApplicationsResponse>, ApiError> {
    let applications = state.db.transaction(|tx| {
        state
            .applications
            .applications_for_applicant(tx, auth.user_id)
    })?;

    Ok(Json(ListApplicationsResponse { applications }))
}

/// Owner decision request.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    /// `approved` or `rejected`.
    pub status: ApplicationDecision,
    /// Note back to the applicant.
    #[serde(default)]
    pub owner_response: Option<String>,
}

/// Approve or reject a pending application.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(application_id): Path<String>,
    Json(request): Json<RespondRequest>,
) -> Result<Json<ApplicationIdResponse>, ApiError> {
    let application_id: ApplicationId = parse_id(&application_id)?;
    let application = state.db.transaction(|tx| {
        state.applications.respond(
            tx,
            auth.user_id,
            application_id,
            request.status,
            request.owner_response,
            Utc::now(),
        )
    })?;

    Ok(Json(ApplicationIdResponse {
        application_id: application.id,
    }))
}

/// Withdraw one of the caller's pending applications.
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(application_id): Path<String>,
) -> Result<Json<ApplicationIdResponse>, ApiError> {
    let application_id: ApplicationId = parse_id(&application_id)?;
    let application = state.db.transaction(|tx| {
        state
            .applications
            .cancel(tx, auth.user_id, application_id, Utc::now())
    })?;

    Ok(Json(ApplicationIdResponse {
        application_id: application.id,
    }))
}

/// Chat roster response.
#[derive(Debug, Serialize)]
pub struct ListParticipantsResponse {
    /// Participants in join order.
    pub participants: Vec<ChatParticipant>,
}

/// List an event's chat participants (owner or participant only).
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<ListParticipantsResponse>, ApiError> {
    let event_id: EventId = parse_id(&event_id)?;
    let participants = state.db.transaction(|tx| {
        state
            .applications
            .chat_participants(tx, auth.user_id, event_id)
    })?;

    Ok(Json(ListParticipantsResponse { participants }))
}
