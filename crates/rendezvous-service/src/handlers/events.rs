//! Event handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use rendezvous_core::{Event, EventId, NewEvent};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::events::EventClosed;
use crate::handlers::parse_id;
use crate::state::AppState;

/// Create an event and reserve credits for its guest slots.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(input): Json<NewEvent>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .db
        .transaction(|tx| state.events.create(tx, auth.user_id, input, Utc::now()))?;

    Ok(Json(event))
}

/// Get one event.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let event_id: EventId = parse_id(&event_id)?;
    let event = state
        .db
        .transaction(|tx| state.events.get(tx, event_id))?;

    Ok(Json(event))
}

/// List events response.
#[derive(Debug, Serialize)]
pub struct ListEventsResponse {
    /// Events ordered by start time.
    pub events: Vec<Event>,
}

/// List events hosted by the caller.
pub async fn list_my_events(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let events = state
        .db
        .transaction(|tx| state.events.hosted_by(tx, auth.user_id))?;

    Ok(Json(ListEventsResponse { events }))
}

/// Delete an event, cancelling pending applications and releasing unused credits.
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<EventClosed>, ApiError> {
    let event_id: EventId = parse_id(&event_id)?;
    let closed = state
        .db
        .transaction(|tx| state.events.delete(tx, auth.user_id, event_id, Utc::now()))?;

    Ok(Json(closed))
}
