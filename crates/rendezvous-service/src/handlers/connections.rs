//! Connection handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use rendezvous_core::{Connection, UserId};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// A connection as seen by one of its ends.
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    /// Connection ID.
    pub id: String,
    /// The other user.
    pub user_id: String,
    /// Event whose approval made the connection.
    pub event_id: String,
    /// Created timestamp.
    pub created_at: String,
}

impl ConnectionResponse {
    fn seen_by(connection: &Connection, viewer: &UserId) -> Self {
        Self {
            id: connection.id.to_string(),
            user_id: connection.other(viewer).to_string(),
            event_id: connection.event_id.to_string(),
            created_at: connection.created_at.to_rfc3339(),
        }
    }
}

/// List connections response.
#[derive(Debug, Serialize)]
pub struct ListConnectionsResponse {
    /// Connections.
    pub connections: Vec<ConnectionResponse>,
}

/// List the caller's connections.
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<ListConnectionsResponse>, ApiError> {
    let connections = state
        .db
        .transaction(|tx| state.applications.connections(tx, auth.user_id))?;

    Ok(Json(ListConnectionsResponse {
        connections: connections
            .iter()
            .map(|c| ConnectionResponse::seen_by(c, &auth.user_id))
            .collect(),
    }))
}
