//! Application state.

use std::sync::Arc;

use rendezvous_store::Database;

use crate::applications::ApplicationWorkflow;
use crate::auth::JwtVerifier;
use crate::config::ServiceConfig;
use crate::events::EventLifecycle;
use crate::ledger::Ledger;
use crate::refunds::RefundReview;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The transactional database.
    pub db: Arc<Database>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// User token verifier.
    pub jwt: JwtVerifier,

    /// Credit ledger.
    pub ledger: Arc<Ledger>,

    /// Application approval workflow.
    pub applications: Arc<ApplicationWorkflow>,

    /// Event create/delete/expire.
    pub events: Arc<EventLifecycle>,

    /// Refund review.
    pub refunds: Arc<RefundReview>,
}

impl AppState {
    /// Wire the services over a database.
    #[must_use]
    pub fn new(db: Arc<Database>, config: ServiceConfig) -> Self {
        let ledger = Arc::new(Ledger::new(config.welcome_grant_credits));
        let applications = Arc::new(ApplicationWorkflow::new(Arc::clone(&ledger)));
        let events = Arc::new(EventLifecycle::new(
            Arc::clone(&ledger),
            Arc::clone(&applications),
        ));
        let refunds = Arc::new(RefundReview::new(Arc::clone(&ledger)));

        if config.admin_user_ids.is_empty() {
            tracing::warn!("No admin users configured - refund review will be unavailable");
        }
        if config.service_api_key.is_none() {
            tracing::warn!("SERVICE_API_KEY not configured - purchases cannot be credited");
        }

        Self {
            db,
            jwt: JwtVerifier::new(&config),
            config,
            ledger,
            applications,
            events,
            refunds,
        }
    }
}
