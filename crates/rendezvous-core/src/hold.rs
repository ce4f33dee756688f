//! Credit holds reserved against events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, HoldId, UserId};

/// Credits reserved by an event owner for the event's guest slots.
///
/// One hold exists per event. `credits_used` never exceeds `credits_held`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditHold {
    /// Hold id.
    pub id: HoldId,
    /// Event owner whose credits are reserved.
    pub user_id: UserId,
    /// Event the credits are reserved for.
    pub event_id: EventId,
    /// Credits reserved when the event was created.
    pub credits_held: u32,
    /// Guest capacity the hold was sized for.
    pub max_guests: u32,
    /// Approvals that consumed a credit from this hold.
    pub credits_used: u32,
    /// Lifecycle state.
    pub status: HoldStatus,
    /// When the hold was placed.
    pub created_at: DateTime<Utc>,
    /// When the hold was released.
    pub released_at: Option<DateTime<Utc>>,
}

impl CreditHold {
    /// Create an active hold of `max_guests` credits.
    #[must_use]
    pub fn new(user_id: UserId, event_id: EventId, max_guests: u32) -> Self {
        Self {
            id: HoldId::generate(),
            user_id,
            event_id,
            credits_held: max_guests,
            max_guests,
            credits_used: 0,
            status: HoldStatus::Active,
            created_at: Utc::now(),
            released_at: None,
        }
    }

    /// Whether the hold still reserves credits.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == HoldStatus::Active
    }

    /// Credits reserved but not yet consumed.
    #[must_use]
    pub const fn unused(&self) -> u32 {
        self.credits_held.saturating_sub(self.credits_used)
    }

    /// Whether every reserved credit has been consumed.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.credits_used >= self.credits_held
    }
}

/// Hold lifecycle. `Released` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    /// Credits are reserved.
    Active,
    /// Unused credits went back to the owner.
    Released,
}
