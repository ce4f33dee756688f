//! Rendezvous HTTP API service.
//!
//! This crate provides the credit ledger and the event workflows built on it,
//! along with their HTTP API:
//!
//! - Credit accounts, holds, deductions, releases and purchases
//! - Event creation, deletion and expiry
//! - Applications, connections and event chat rosters
//! - Refund requests and admin review
//!
//! Every operation runs as a single transaction against the store, so a
//! failure partway through an approval or an event deletion leaves no trace.
//!
//! # Authentication
//!
//! The service supports two authentication methods:
//!
//! 1. **HS256 JWT tokens** - For end-user requests. Users listed in
//!    `ADMIN_USER_IDS` carry the admin role.
//! 2. **Service API keys** - For the payment processor crediting purchases.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for axum even when the work is not

pub mod applications;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ledger;
pub mod refunds;
pub mod routes;
pub mod state;
pub mod sweep;

pub use applications::ApplicationWorkflow;
pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use events::{EventClosed, EventLifecycle, ExpirySummary};
pub use ledger::{DeductOutcome, HoldOutcome, Ledger, ReleaseOutcome};
pub use refunds::{RefundClaim, RefundReview, ReviewOutcome};
pub use routes::create_router;
pub use state::AppState;
pub use sweep::spawn_expiry_sweep;
