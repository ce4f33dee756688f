//! Refund requests for no-show participants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApplicationId, EventId, RefundRequestId, UserId};

/// Credits restored by an approved refund request.
pub const REFUND_CREDITS: u32 = 1;

/// An event owner's claim that an approved participant did not show up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Request id.
    pub id: RefundRequestId,
    /// Requester, the event owner.
    pub user_id: UserId,
    /// Past event.
    pub event_id: EventId,
    /// The approved application that consumed the credit.
    pub application_id: ApplicationId,
    /// The alleged no-show.
    pub participant_user_id: UserId,
    /// Credits to restore, always [`REFUND_CREDITS`].
    pub credits_to_refund: u32,
    /// Requester's explanation.
    pub reason: String,
    /// Storage references of supporting images.
    pub evidence_images: Vec<String>,
    /// Current state.
    pub status: RefundStatus,
    /// Reviewer's notes.
    pub admin_notes: Option<String>,
    /// Reviewing admin.
    pub reviewed_by: Option<UserId>,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When the decision was made.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// When the credit was restored.
    pub processed_at: Option<DateTime<Utc>>,
}

impl RefundRequest {
    /// Create a pending request.
    #[must_use]
    pub fn new(
        user_id: UserId,
        event_id: EventId,
        application_id: ApplicationId,
        participant_user_id: UserId,
        reason: String,
        evidence_images: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: RefundRequestId::generate(),
            user_id,
            event_id,
            application_id,
            participant_user_id,
            credits_to_refund: REFUND_CREDITS,
            reason,
            evidence_images,
            status: RefundStatus::Pending,
            admin_notes: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            processed_at: None,
        }
    }
}

/// Refund request state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Waiting for review.
    Pending,
    /// Being looked at. Not produced by the current review flow.
    UnderReview,
    /// Credit restored.
    Approved,
    /// Declined.
    Rejected,
}

impl RefundStatus {
    /// Whether the request was decided.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Admin decision on a refund request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundDecision {
    /// Restore the credit.
    Approved,
    /// Keep the credit consumed.
    Rejected,
}

impl From<RefundDecision> for RefundStatus {
    fn from(decision: RefundDecision) -> Self {
        match decision {
            RefundDecision::Approved => Self::Approved,
            RefundDecision::Rejected => Self::Rejected,
        }
    }
}
