//! Profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use rendezvous_core::{DomainError, Profile};
use rendezvous_store::Records;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Profile update request.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// Display name.
    pub display_name: String,
    /// Date of birth, checked against event age limits.
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

/// Create or replace the caller's profile.
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let display_name = request.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::BadRequest("display_name must not be empty".into()));
    }

    let now = Utc::now();
    if request
        .date_of_birth
        .is_some_and(|dob| dob > now.date_naive())
    {
        return Err(ApiError::BadRequest(
            "date_of_birth must not be in the future".into(),
        ));
    }

    let profile = Profile {
        user_id: auth.user_id,
        display_name: display_name.to_string(),
        date_of_birth: request.date_of_birth,
        updated_at: now,
    };

    state.db.transaction(|tx| -> Result<(), DomainError> {
        tx.put_profile(&profile)?;
        Ok(())
    })?;

    Ok(Json(profile))
}

/// Get the caller's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = state.db.transaction(|tx| -> Result<_, DomainError> {
        tx.profile(&auth.user_id)?
            .ok_or_else(|| DomainError::not_found("profile", auth.user_id))
    })?;

    Ok(Json(profile))
}
