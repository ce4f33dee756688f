//! Connections and event chat rosters created by approvals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ConnectionId, EventId, UserId};

/// A bidirectional link between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection id.
    pub id: ConnectionId,
    /// First user, as inserted.
    pub user_a: UserId,
    /// Second user, as inserted.
    pub user_b: UserId,
    /// Event whose approval created the connection.
    pub event_id: EventId,
    /// When the connection was made.
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Connect two users.
    #[must_use]
    pub fn new(user_a: UserId, user_b: UserId, event_id: EventId) -> Self {
        Self {
            id: ConnectionId::generate(),
            user_a,
            user_b,
            event_id,
            created_at: Utc::now(),
        }
    }

    /// Whether `user` is one of the two ends.
    #[must_use]
    pub fn involves(&self, user: &UserId) -> bool {
        self.user_a == *user || self.user_b == *user
    }

    /// The end that is not `user`.
    #[must_use]
    pub fn other(&self, user: &UserId) -> UserId {
        if self.user_a == *user {
            self.user_b
        } else {
            self.user_a
        }
    }
}

/// A member of an event's chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatParticipant {
    /// Event chat.
    pub event_id: EventId,
    /// Member.
    pub user_id: UserId,
    /// Why the user is in the chat.
    pub role: ParticipantRole,
    /// When the user joined.
    pub joined_at: DateTime<Utc>,
}

impl ChatParticipant {
    /// Add `user_id` to the chat of `event_id`.
    #[must_use]
    pub fn new(event_id: EventId, user_id: UserId, role: ParticipantRole) -> Self {
        Self {
            event_id,
            user_id,
            role,
            joined_at: Utc::now(),
        }
    }
}

/// Chat participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    /// The event host.
    Owner,
    /// An approved applicant.
    Guest,
}
