//! The event-application approval workflow.
//!
//! An application starts `pending`. The event owner approves or rejects it and
//! the applicant may cancel it; every other transition is an
//! [`DomainError::InvalidState`]. Approval consumes one held credit, connects
//! owner and applicant and adds both to the event chat, all in the caller's
//! transaction.
//!
//! This module is the only writer of chat participants and of
//! `Event::chat_participant_count`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use rendezvous_core::{
    ApplicationDecision, ApplicationId, ApplicationStatus, ChatParticipant, Connection,
    DomainError, Event, EventApplication, EventId, ParticipantRole, Result, UserId,
};
use rendezvous_store::{Records, Tx};

use crate::ledger::Ledger;

/// Applies, responds to and cancels event applications.
#[derive(Debug, Clone)]
pub struct ApplicationWorkflow {
    ledger: Arc<Ledger>,
}

impl ApplicationWorkflow {
    /// Create the workflow on top of a ledger.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// Submit a pending application to an active event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] if the event does not exist or is no longer active
    /// - [`DomainError::Forbidden`] if the applicant owns the event
    /// - [`DomainError::Conflict`] if the applicant already applied, whatever that application's status
    /// - [`DomainError::DateOfBirthRequired`] or [`DomainError::AgeRestricted`] for age-restricted events
    /// - [`DomainError::EventFull`] if every guest slot is taken
    pub fn apply(
        &self,
        tx: &mut dyn Tx,
        applicant_id: UserId,
        event_id: EventId,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<EventApplication> {
        let event = tx
            .event(&event_id)?
            .filter(Event::is_active)
            .ok_or_else(|| DomainError::not_found("event", event_id))?;

        if event.owner_id == applicant_id {
            return Err(DomainError::Forbidden(
                "cannot apply to your own event".into(),
            ));
        }

        if let Some(existing) = tx.application_for(&event_id, &applicant_id)? {
            return Err(DomainError::Conflict(format!(
                "already applied to this event (application is {})",
                existing.status.as_str()
            )));
        }

        if event.is_age_restricted() {
            check_age(tx, &event, &applicant_id, now)?;
        }

        if approved_count(tx, &event_id)? >= event.max_guests {
            return Err(DomainError::EventFull {
                max_guests: event.max_guests,
            });
        }

        let application = EventApplication::new(&event, applicant_id, message);
        tx.put_application(&application)?;

        tracing::info!(
            target: "audit",
            severity = "low",
            action = "application_submitted",
            application_id = %application.id,
            event_id = %event_id,
            applicant_id = %applicant_id,
            "Event application submitted"
        );

        Ok(application)
    }

    /// Approve or reject a pending application as the event owner.
    ///
    /// Approval re-checks capacity, then connects the two users, deducts one
    /// held credit and makes sure both are in the event chat.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for a missing application or event
    /// - [`DomainError::Forbidden`] unless `owner_id` owns the event
    /// - [`DomainError::InvalidState`] unless the application is pending
    /// - [`DomainError::EventFull`] when approving into a full event
    /// - any ledger error from the deduction
    pub fn respond(
        &self,
        tx: &mut dyn Tx,
        owner_id: UserId,
        application_id: ApplicationId,
        decision: ApplicationDecision,
        owner_response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<EventApplication> {
        let mut application = tx
            .application(&application_id)?
            .ok_or_else(|| DomainError::not_found("application", application_id))?;
        let mut event = tx
            .event(&application.event_id)?
            .ok_or_else(|| DomainError::not_found("event", application.event_id))?;

        if event.owner_id != owner_id {
            return Err(DomainError::Forbidden(
                "only the event owner can respond to applications".into(),
            ));
        }
        ensure_pending(&application)?;

        let approving = decision == ApplicationDecision::Approved;
        if approving && approved_count(tx, &event.id)? >= event.max_guests {
            return Err(DomainError::EventFull {
                max_guests: event.max_guests,
            });
        }

        application.status = decision.into();
        application.owner_response = owner_response;
        application.updated_at = now;
        application.responded_at = Some(now);
        tx.put_application(&application)?;

        if approving {
            connect(tx, owner_id, application.applicant_id, event.id)?;
            self.ledger
                .deduct(tx, owner_id, event.id, application.id)?;

            // Events created before chats existed have no owner row yet.
            let owner_joined =
                self.add_chat_participant(tx, &mut event, owner_id, ParticipantRole::Owner, now)?;
            let guest_joined = self.add_chat_participant(
                tx,
                &mut event,
                application.applicant_id,
                ParticipantRole::Guest,
                now,
            )?;
            if owner_joined || guest_joined {
                tx.put_event(&event)?;
            }
        }

        tracing::info!(
            application_id = %application.id,
            event_id = %event.id,
            status = application.status.as_str(),
            "Application answered"
        );

        Ok(application)
    }

    /// Withdraw a pending application as its applicant. No credit changes hands.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NotFound`] for a missing application
    /// - [`DomainError::Forbidden`] unless it is the caller's application
    /// - [`DomainError::InvalidState`] unless the application is pending
    pub fn cancel(
        &self,
        tx: &mut dyn Tx,
        applicant_id: UserId,
        application_id: ApplicationId,
        now: DateTime<Utc>,
    ) -> Result<EventApplication> {
        let mut application = tx
            .application(&application_id)?
            .ok_or_else(|| DomainError::not_found("application", application_id))?;

        if application.applicant_id != applicant_id {
            return Err(DomainError::Forbidden(
                "only the applicant can cancel an application".into(),
            ));
        }
        ensure_pending(&application)?;

        application.status = ApplicationStatus::Cancelled;
        application.updated_at = now;
        tx.put_application(&application)?;

        tracing::info!(application_id = %application.id, "Application cancelled");

        Ok(application)
    }

    /// Applications to an event, oldest first. Owner only.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] or [`DomainError::Forbidden`].
    pub fn applications_for_event(
        &self,
        tx: &dyn Tx,
        owner_id: UserId,
        event_id: EventId,
    ) -> Result<Vec<EventApplication>> {
        let event = tx
            .event(&event_id)?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;
        if event.owner_id != owner_id {
            return Err(DomainError::Forbidden(
                "only the event owner can list its applications".into(),
            ));
        }
        Ok(tx.applications_for_event(&event_id)?)
    }

    /// The caller's own applications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn applications_for_applicant(
        &self,
        tx: &dyn Tx,
        applicant_id: UserId,
    ) -> Result<Vec<EventApplication>> {
        Ok(tx.applications_for_applicant(&applicant_id)?)
    }

    /// The caller's connections, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn connections(&self, tx: &dyn Tx, user_id: UserId) -> Result<Vec<Connection>> {
        Ok(tx.connections_for_user(&user_id)?)
    }

    /// An event's chat roster, visible to its owner and participants.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] or [`DomainError::Forbidden`].
    pub fn chat_participants(
        &self,
        tx: &dyn Tx,
        user_id: UserId,
        event_id: EventId,
    ) -> Result<Vec<ChatParticipant>> {
        let event = tx
            .event(&event_id)?
            .ok_or_else(|| DomainError::not_found("event", event_id))?;
        if event.owner_id != user_id && tx.chat_participant(&event_id, &user_id)?.is_none() {
            return Err(DomainError::Forbidden(
                "only chat participants can see the roster".into(),
            ));
        }
        Ok(tx.chat_participants(&event_id)?)
    }

    /// Add a user to an event chat unless already there.
    ///
    /// Returns whether a row was inserted. The caller persists `event`.
    pub(crate) fn add_chat_participant(
        &self,
        tx: &mut dyn Tx,
        event: &mut Event,
        user_id: UserId,
        role: ParticipantRole,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if tx.chat_participant(&event.id, &user_id)?.is_some() {
            return Ok(false);
        }
        tx.put_chat_participant(&ChatParticipant::new(event.id, user_id, role))?;
        event.chat_participant_count = event.chat_participant_count.saturating_add(1);
        event.updated_at = now;
        Ok(true)
    }

    /// Cancel every pending application of an event. Returns how many changed.
    pub(crate) fn cancel_pending_for_event(
        &self,
        tx: &mut dyn Tx,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        let mut cancelled = 0;
        for mut application in tx.applications_for_event(&event_id)? {
            if application.status != ApplicationStatus::Pending {
                continue;
            }
            application.status = ApplicationStatus::Cancelled;
            application.updated_at = now;
            tx.put_application(&application)?;
            cancelled += 1;
        }
        Ok(cancelled)
    }
}

fn ensure_pending(application: &EventApplication) -> Result<()> {
    if application.status == ApplicationStatus::Pending {
        Ok(())
    } else {
        Err(DomainError::InvalidState(format!(
            "application is already {}",
            application.status.as_str()
        )))
    }
}

fn approved_count(tx: &dyn Tx, event_id: &EventId) -> Result<u32> {
    let approved = tx
        .applications_for_event(event_id)?
        .iter()
        .filter(|a| a.status == ApplicationStatus::Approved)
        .count();
    Ok(u32::try_from(approved).unwrap_or(u32::MAX))
}

fn check_age(tx: &dyn Tx, event: &Event, applicant_id: &UserId, now: DateTime<Utc>) -> Result<()> {
    let age = tx
        .profile(applicant_id)?
        .and_then(|profile| profile.age_on(now))
        .ok_or(DomainError::DateOfBirthRequired)?;

    if event.admits_age(age) {
        Ok(())
    } else {
        Err(DomainError::AgeRestricted {
            age,
            min_age: event.min_age,
            max_age: event.max_age,
        })
    }
}

/// Connect two users unless they already are, in either direction.
fn connect(tx: &mut dyn Tx, owner_id: UserId, applicant_id: UserId, event_id: EventId) -> Result<()> {
    if tx.connection_between(&owner_id, &applicant_id)?.is_none() {
        tx.put_connection(&Connection::new(owner_id, applicant_id, event_id))?;
    }
    Ok(())
}
