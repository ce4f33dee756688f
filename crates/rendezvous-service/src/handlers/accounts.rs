//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use rendezvous_core::CreditAccount;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Credits spendable now.
    pub available_credits: u32,
    /// Credits reserved against open events.
    pub held_credits: u32,
    /// Lifetime credits purchased.
    pub total_purchased: u32,
    /// Lifetime credits consumed.
    pub total_used: u32,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&CreditAccount> for AccountResponse {
    fn from(account: &CreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            available_credits: account.available_credits,
            held_credits: account.held_credits,
            total_purchased: account.total_purchased,
            total_used: account.total_used,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Open the caller's credit account with the welcome grant.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .db
        .transaction(|tx| state.ledger.initialize(tx, auth.user_id))?;

    Ok(Json(AccountResponse::from(&account)))
}
