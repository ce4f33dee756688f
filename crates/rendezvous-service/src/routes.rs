//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    accounts, admin, applications, connections, credits, events, health, profiles, refunds,
};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts and credits (JWT auth)
/// - `POST /v1/accounts` - Open an account with the welcome grant
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/sufficient?required=N` - Sufficiency check
/// - `GET /v1/credits/transactions` - Transaction history
/// - `GET /v1/credits/holds` - Holds, active and released
/// - `POST /v1/credits/hold` - Reserve credits for an event
/// - `POST /v1/credits/deduct` - Consume one held credit
/// - `POST /v1/credits/release` - Return unused held credits
///
/// ## Purchases (Service API Key auth)
/// - `POST /v1/credits/purchases` - Credit a completed payment
///
/// ## Profiles, events and applications (JWT auth)
/// - `PUT|GET /v1/profiles/me`
/// - `POST /v1/events`, `GET /v1/events/mine`
/// - `GET|DELETE /v1/events/:id`
/// - `POST|GET /v1/events/:id/applications`
/// - `GET /v1/events/:id/participants`
/// - `GET /v1/applications/mine`
/// - `POST /v1/applications/:id/respond`
/// - `POST /v1/applications/:id/cancel`
/// - `GET /v1/connections`
///
/// ## Refunds (JWT auth)
/// - `POST /v1/refunds`, `GET /v1/refunds/mine`
///
/// ## Admin (JWT auth, admin role)
/// - `GET /v1/admin/refunds?status=` - Review queue
/// - `POST /v1/admin/refunds/:id/review` - Decide a request
/// - `POST /v1/admin/events/expire` - Expire finished events now
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Accounts
        .route("/v1/accounts", post(accounts::create_account))
        // Credits
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/credits/sufficient", get(credits::check_sufficient))
        .route("/v1/credits/transactions", get(credits::list_transactions))
        .route("/v1/credits/holds", get(credits::list_holds))
        .route("/v1/credits/hold", post(credits::hold))
        .route("/v1/credits/deduct", post(credits::deduct))
        .route("/v1/credits/release", post(credits::release))
        .route("/v1/credits/purchases", post(credits::record_purchase))
        // Profiles
        .route(
            "/v1/profiles/me",
            get(profiles::get_profile).put(profiles::put_profile),
        )
        // Events
        .route("/v1/events", post(events::create_event))
        .route("/v1/events/mine", get(events::list_my_events))
        .route(
            "/v1/events/:id",
            get(events::get_event).delete(events::delete_event),
        )
        .route(
            "/v1/events/:id/applications",
            post(applications::apply).get(applications::list_for_event),
        )
        .route(
            "/v1/events/:id/participants",
            get(applications::list_participants),
        )
        // Applications
        .route("/v1/applications/mine", get(applications::list_mine))
        .route("/v1/applications/:id/respond", post(applications::respond))
        .route("/v1/applications/:id/cancel", post(applications::cancel))
        .route("/v1/connections", get(connections::list_connections))
        // Refunds
        .route("/v1/refunds", post(refunds::submit))
        .route("/v1/refunds/mine", get(refunds::list_mine))
        // Admin
        .route("/v1/admin/refunds", get(admin::list_refunds))
        .route("/v1/admin/refunds/:id/review", post(admin::review_refund))
        .route("/v1/admin/events/expire", post(admin::expire_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
