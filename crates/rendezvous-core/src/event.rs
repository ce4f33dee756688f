//! Events and the profile fields the application workflow reads.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EventId, UserId};

/// Guest capacity used when an event does not specify one.
pub const DEFAULT_MAX_GUESTS: u32 = 1;

/// Milliseconds in 365.25 days, times four to stay in integers.
const FOUR_YEARS_MS: i64 = 1461 * 86_400_000;

/// An event hosted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub id: EventId,
    /// Host.
    pub owner_id: UserId,
    /// Display title.
    pub title: String,
    /// Title of the hosting room, denormalized for display.
    pub room_title: Option<String>,
    /// When the event starts.
    pub start_time: DateTime<Utc>,
    /// When the event ends, if known.
    pub end_time: Option<DateTime<Utc>>,
    /// Guest capacity. Also the size of the credit hold.
    pub max_guests: u32,
    /// Youngest allowed guest age.
    pub min_age: Option<u32>,
    /// Oldest allowed guest age.
    pub max_age: Option<u32>,
    /// Lifecycle state.
    pub status: EventStatus,
    /// Number of chat participants (owner included).
    pub chat_participant_count: u32,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
    /// When the event was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build an active event from creation input.
    #[must_use]
    pub fn new(owner_id: UserId, input: NewEvent) -> Self {
        let now = Utc::now();
        Self {
            id: EventId::generate(),
            owner_id,
            title: input.title,
            room_title: input.room_title,
            start_time: input.start_time,
            end_time: input.end_time,
            max_guests: input.max_guests.unwrap_or(DEFAULT_MAX_GUESTS),
            min_age: input.min_age,
            max_age: input.max_age,
            status: EventStatus::Active,
            chat_participant_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the event still accepts applications.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EventStatus::Active
    }

    /// Whether the event has an age restriction.
    #[must_use]
    pub const fn is_age_restricted(&self) -> bool {
        self.min_age.is_some() || self.max_age.is_some()
    }

    /// Whether `age` is within the event's bounds.
    #[must_use]
    pub fn admits_age(&self, age: u32) -> bool {
        self.min_age.map_or(true, |min| age >= min) && self.max_age.map_or(true, |max| age <= max)
    }

    /// The instant after which the event counts as over.
    #[must_use]
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.end_time.unwrap_or(self.start_time)
    }

    /// Whether the event has started by `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now
    }
}

/// Event lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Open for applications.
    Active,
    /// Removed by its owner.
    Deleted,
    /// Ended and swept.
    Expired,
}

/// Input for creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display title.
    pub title: String,
    /// Hosting room title.
    #[serde(default)]
    pub room_title: Option<String>,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// End time.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Guest capacity, [`DEFAULT_MAX_GUESTS`] when absent.
    #[serde(default)]
    pub max_guests: Option<u32>,
    /// Youngest allowed guest age.
    #[serde(default)]
    pub min_age: Option<u32>,
    /// Oldest allowed guest age.
    #[serde(default)]
    pub max_age: Option<u32>,
}

/// Profile fields read by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Owner of the profile.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// When the profile was last modified.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Age in whole years at `now`, or `None` without a date of birth.
    #[must_use]
    pub fn age_on(&self, now: DateTime<Utc>) -> Option<u32> {
        self.date_of_birth.map(|dob| age_on(dob, now))
    }
}

/// `floor((now - date_of_birth) / 365.25 days)`, with the birth date at midnight UTC.
///
/// Dates of birth in the future give zero.
#[must_use]
pub fn age_on(date_of_birth: NaiveDate, now: DateTime<Utc>) -> u32 {
    let born = date_of_birth.and_time(NaiveTime::default()).and_utc();
    let elapsed_ms = (now - born).num_milliseconds();
    let years = (elapsed_ms * 4).div_euclid(FOUR_YEARS_MS);
    u32::try_from(years.max(0)).unwrap_or(u32::MAX)
}
