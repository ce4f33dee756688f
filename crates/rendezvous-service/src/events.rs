//! Event creation, deletion and expiry.
//!
//! Creating an event reserves its guest slots on the ledger. Deleting or
//! expiring it cancels the pending applications and releases whatever part of
//! the hold was not consumed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rendezvous_core::{
    DomainError, Event, EventId, EventStatus, NewEvent, ParticipantRole, Result, UserId,
};
use rendezvous_store::{Records, Tx};

use crate::applications::ApplicationWorkflow;
use crate::ledger::Ledger;

/// What closing one event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

/// Totals of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySummary {
    /// Events moved to `expired`.
    pub events_expired: u32,
    /// Held credits returned across those events.
    pub credits_released: u32,
}

/// Event operations that move credits.
#[derive(Debug, Clone)]
pub struct EventLifecycle {
    ledger: Arc<Ledger>,
    workflow: Arc<ApplicationWorkflow>,
}

impl EventLifecycle {
    /// Create the lifecycle service.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, workflow: Arc<ApplicationWorkflow>) -> Self {
        Self { ledger, workflow }
    }

    /// Create an active event and hold one credit per guest slot.
    ///
    /// The owner becomes the first chat participant.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] for an empty title, zero guests,
    ///   `min_age > max_age` or an end time not after the start time
    /// - [`DomainError::InsufficientCredits`] if the owner cannot cover the hold
    pub fn create(
        &self,
        tx: &mut dyn Tx,
        owner_id: UserId,
        input: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Event> {
        validate(&input)?;

        let mut event = Event::new(owner_id, input);
        tx.put_event(&event)?;
        self.ledger
            .hold(tx, owner_id, event.id, event.max_guests, Some(&event.title))?;
        self.workflow
            .add_chat_participant(tx, &mut event, owner_id, ParticipantRole::Owner, now)?;
        tx.put_event(&event)?;

        tracing::info!(
            event_id = %event.id,
            owner_id = %owner_id,
            max_guests = event.max_guests,
            "Event created"
        );

        Ok(event)
    }

    /// Get an event in any status.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] if it does not exist.
    pub fn get(&self, tx: &dyn Tx, event_id: EventId) -> Result<Event> {
        tx.event(&event_id)?
            .ok_or_else(|| DomainError::not_found("event", event_id))
    }

    /// Events hosted by a user, soonest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn hosted_by(&self, tx: &dyn Tx, owner_id: UserId) -> Result<Vec<Event>> {
        Ok(tx.events_for_owner(&owner_id)?)
    }

    /// Delete an event as its owner.
    ///
    /// An event without a hold is deleted without error.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] if it does not exist
    /// - [`DomainError::Forbidden`] unless `owner_id` owns it
    /// - [`DomainError::InvalidState`] if it is no longer active
    pub fn delete(
        &self,
        tx: &mut dyn Tx,
        owner_id: UserId,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<EventClosed> {
        let event = self.get(tx, event_id)?;
        if event.owner_id != owner_id {
            return Err(DomainError::Forbidden(
                "only the event owner can delete it".into(),
            ));
        }
        if !event.is_active() {
            return Err(DomainError::InvalidState(format!(
                "event {event_id} is no longer active"
            )));
        }

        self.close(tx, event, EventStatus::Deleted, now)
    }

    /// Expire every active event that ended at or before `now`.
    ///
    /// An event without an end time ends when it starts.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole sweep.
    pub fn expire_due(&self, tx: &mut dyn Tx, now: DateTime<Utc>) -> Result<ExpirySummary> {
        let due: Vec<Event> = tx
            .all_events()?
            .into_iter()
            .filter(|event| event.is_active() && event.ends_at() <= now)
            .collect();

        let mut summary = ExpirySummary::default();
        for event in due {
            let closed = self.close(tx, event, EventStatus::Expired, now)?;
            summary.events_expired += 1;
            summary.credits_released = summary
                .credits_released
                .saturating_add(closed.credits_released);
        }

        if summary.events_expired > 0 {
            tracing::info!(
                events_expired = summary.events_expired,
                credits_released = summary.credits_released,
                "Expired finished events"
            );
        }

        Ok(summary)
    }

    fn close(
        &self,
        tx: &mut dyn Tx,
        mut event: Event,
        status: EventStatus,
        now: DateTime<Utc>,
    ) -> Result<EventClosed> {
        event.status = status;
        event.updated_at = now;
        tx.put_event(&event)?;

        let applications_cancelled = self.workflow.cancel_pending_for_event(tx, event.id, now)?;

        let description = match status {
            EventStatus::Expired => format!("Released unused credits after \"{}\" ended", event.title),
            _ => format!("Released unused credits for deleted event \"{}\"", event.title),
        };
        let released = self.ledger.release(
            tx,
            event.owner_id,
            event.id,
            Some(&description),
            false,
        )?;

        tracing::info!(
            event_id = %event.id,
            status = ?status,
            applications_cancelled,
            credits_released = released.credits_released,
            "Event closed"
        );

        Ok(EventClosed {
            event_id: event.id,
            status,
            applications_cancelled,
            credits_released: released.credits_released,
        })
    }
}

fn validate(input: &NewEvent) -> Result<()> {
    if input.title.trim().is_empty() {
        return Err(DomainError::InvalidInput("title must not be empty".into()));
    }
    if input.max_guests == Some(0) {
        return Err(DomainError::InvalidInput(
            "max_guests must be at least 1".into(),
        ));
    }
    if let (Some(min), Some(max)) = (input.min_age, input.max_age) {
        if min > max {
            return Err(DomainError::InvalidInput(
                "min_age must not exceed max_age".into(),
            ));
        }
    }
    if let Some(end) = input.end_time {
        if end <= input.start_time {
            return Err(DomainError::InvalidInput(
                "end_time must be after start_time".into(),
            ));
        }
    }
    Ok(())
}
