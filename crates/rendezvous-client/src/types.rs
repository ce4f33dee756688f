//! Request and response types for the rendezvous client.
//!
//! Records that the API returns verbatim (events, applications, refund
//! requests, balances) are the `rendezvous_core` types themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use rendezvous_core::{
    ApplicationDecision, ApplicationId, ChatParticipant, CreditBalance, CreditHold, Event,
    EventApplication, EventId, EventStatus, HoldStatus, NewEvent, ParticipantRole, Profile,
    RefundDecision, RefundRequest, RefundRequestId, RefundStatus, Sufficiency, UserId,
};

/// Account snapshot returned when an account is opened or credited.
#[derive(Debug, Clone, Deserialize)]
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

/// One ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEntry {
    /// Transaction ID.
    pub id: String,
    /// Transaction type (`hold`, `deduction`, ...).
    pub transaction_type: String,
    /// Signed amount.
    pub amount: i64,
    /// Related event.
    pub related_event_id: Option<String>,
    /// Related application.
    pub related_application_id: Option<String>,
    /// Description.
    pub description: String,
    /// Available balance after this entry.
    pub available_after: u32,
    /// Held balance after this entry.
    pub held_after: u32,
    /// Timestamp.
    pub timestamp: String,
}

/// A page of ledger entries, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    /// Entries.
    pub transactions: Vec<TransactionEntry>,
    /// Whether more entries follow.
    pub has_more: bool,
}

/// Result of reserving credits for an event.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HoldOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Credits moved from available to held.
    pub credits_held: u32,
}

/// Result of consuming a held credit.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeductOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Held credits consumed.
    pub credits_deducted: u32,
}

/// Result of releasing a hold.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReleaseOutcome {
    /// `true` unless the call failed.
    pub success: bool,
    /// Unused held credits returned to available.
    pub credits_released: u32,
}

/// Release options.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRequest {
    /// Event whose hold is released.
    pub event_id: EventId,
    /// Description for the ledger entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fail with [`crate::ClientError::NotFound`] when there is no active hold.
    pub throw_on_missing_hold: bool,
}

impl ReleaseRequest {
    /// Release `event_id`, failing when it has no active hold.
    #[must_use]
    pub const fn new(event_id: EventId) -> Self {
        Self {
            event_id,
            description: None,
            throw_on_missing_hold: true,
        }
    }
}

/// Profile fields the caller can set.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    /// Display name, must not be blank.
    pub display_name: String,
    /// Date of birth, required to join age-restricted events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

/// Credit purchase reported by the payment processor.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRequest {
    /// User the credits are for.
    pub user_id: UserId,
    /// Credits bought.
    pub credits: u32,
    /// Payment gateway reference.
    pub payment_transaction_id: String,
    /// Description for the ledger entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What closing an event changed.
#[derive(Debug, Clone, Deserialize)]
pub struct EventClosed {
    /// The closed event.
    pub event_id: EventId,
    /// Its new status.
    pub status: EventStatus,
    /// Pending applications that were cancelled.
    pub applications_cancelled: u32,
    /// Held credits returned to the owner.
    pub credits_released: u32,
}

/// Totals of an expiry sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpirySummary {
    /// Events moved to `expired`.
    pub events_expired: u32,
    /// Held credits returned.
    pub credits_released: u32,
}

/// A connection seen from the caller's side.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionView {
    /// Connection ID.
    pub id: String,
    /// The other user.
    pub user_id: String,
    /// Event whose approval made the connection.
    pub event_id: String,
    /// Created timestamp.
    pub created_at: String,
}

/// Refund request submission.
#[derive(Debug, Clone, Serialize)]
pub struct RefundClaim {
    /// The event the participant missed.
    pub event_id: EventId,
    /// The participant's approved application.
    pub application_id: ApplicationId,
    /// The participant who did not show up.
    pub participant_user_id: UserId,
    /// Why the credit should come back.
    pub reason: String,
    /// References to uploaded evidence.
    pub evidence_images: Vec<String>,
}

/// Result of a refund review.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// The recorded decision.
    pub decision: RefundDecision,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationIdBody {
    pub application_id: ApplicationId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefundIdBody {
    pub refund_request_id: RefundRequestId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsBody {
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HoldsBody {
    pub holds: Vec<CreditHold>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParticipantsBody {
    pub participants: Vec<ChatParticipant>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationsBody {
    pub applications: Vec<EventApplication>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConnectionsBody {
    pub connections: Vec<ConnectionView>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefundRequestsBody {
    pub refund_requests: Vec<RefundRequest>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
