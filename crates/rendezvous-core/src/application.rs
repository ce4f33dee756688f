//! Event applications (join requests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApplicationId, Event, EventId, UserId};

/// A request by a user to join an event.
///
/// Created `pending`; the owner moves it to `approved` or `rejected`, the
/// applicant to `cancelled`. Terminal states never change again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventApplication {
    /// Application id.
    pub id: ApplicationId,
    /// Event applied to.
    pub event_id: EventId,
    /// Applying user.
    pub applicant_id: UserId,
    /// Event owner at application time.
    pub owner_id: UserId,
    /// Current state.
    pub status: ApplicationStatus,
    /// Note from the applicant.
    pub message: Option<String>,
    /// Note from the owner with the decision.
    pub owner_response: Option<String>,
    /// Event title, denormalized for display.
    pub event_title: String,
    /// Event start, denormalized for display.
    pub event_start_time: DateTime<Utc>,
    /// Room title, denormalized for display.
    pub room_title: Option<String>,
    /// When the application was made.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
    /// When the owner decided.
    pub responded_at: Option<DateTime<Utc>>,
}

impl EventApplication {
    /// Create a pending application for `event`.
    #[must_use]
    pub fn new(event: &Event, applicant_id: UserId, message: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicationId::generate(),
            event_id: event.id,
            applicant_id,
            owner_id: event.owner_id,
            status: ApplicationStatus::Pending,
            message,
            owner_response: None,
            event_title: event.title.clone(),
            event_start_time: event.start_time,
            room_title: event.room_title.clone(),
            created_at: now,
            updated_at: now,
            responded_at: None,
        }
    }
}

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    /// Waiting for the owner.
    Pending,
    /// Accepted by the owner. Consumed one credit.
    Approved,
    /// Declined by the owner.
    Rejected,
    /// Withdrawn by the applicant.
    Cancelled,
}

impl ApplicationStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The snake_case name used in messages and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Owner decision on a pending application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationDecision {
    /// Accept the applicant.
    Approved,
    /// Decline the applicant.
    Rejected,
}

impl From<ApplicationDecision> for ApplicationStatus {
    fn from(decision: ApplicationDecision) -> Self {
        match decision {
            ApplicationDecision::Approved => Self::Approved,
            ApplicationDecision::Rejected => Self::Rejected,
        }
    }
}
