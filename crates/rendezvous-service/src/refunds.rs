//! Refund review for no-shows.
//!
//! An event owner can ask for the credit consumed by an approved participant
//! back once the event has started. An admin approves or rejects the request;
//! approval restores the credit on the ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rendezvous_core::{
    Actor, ApplicationId, ApplicationStatus, DomainError, EventId, RefundDecision, RefundRequest,
    RefundRequestId, RefundStatus, Result, UserId,
};
use rendezvous_store::{Records, Tx};

use crate::ledger::Ledger;

/// Input for [`RefundReview::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundClaim {
    /// The event the participant missed.
    pub event_id: EventId,
    /// The participant's approved application.
    pub application_id: ApplicationId,
    /// The participant who did not show up.
    pub participant_user_id: UserId,
    /// Why the owner wants the credit back.
    pub reason: String,
    /// References to uploaded evidence.
    #[serde(default)]
    pub evidence_images: Vec<String>,
}

/// Result of [`RefundReview::review`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// The decision that was recorded.
    pub decision: RefundDecision,
}

/// Submits and decides refund requests.
#[derive(Debug, Clone)]
pub struct RefundReview {
    ledger: Arc<Ledger>,
}

impl RefundReview {
    /// Create the review service on top of a ledger.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    /// File a refund request for an approved participant of a started event.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] for an empty reason
    /// - [`DomainError::NotFound`] for a missing event or application
    /// - [`DomainError::Forbidden`] unless the caller owns the event, the
    ///   application belongs to that event and participant, and the event has started
    /// - [`DomainError::InvalidState`] unless the application is approved
    /// - [`DomainError::Conflict`] if the application already has a request
    pub fn submit(
        &self,
        tx: &mut dyn Tx,
        owner_id: UserId,
        claim: RefundClaim,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest> {
        if claim.reason.trim().is_empty() {
            return Err(DomainError::InvalidInput("reason must not be empty".into()));
        }

        let event = tx
            .event(&claim.event_id)?
            .ok_or_else(|| DomainError::not_found("event", claim.event_id))?;
        let application = tx
            .application(&claim.application_id)?
            .ok_or_else(|| DomainError::not_found("application", claim.application_id))?;

        if event.owner_id != owner_id {
            return Err(DomainError::Forbidden(
                "only the event owner can request a refund".into(),
            ));
        }
        if application.status != ApplicationStatus::Approved {
            return Err(DomainError::InvalidState(format!(
                "application is {}, only approved applications can be refunded",
                application.status.as_str()
            )));
        }
        if application.event_id != event.id
            || application.applicant_id != claim.participant_user_id
        {
            return Err(DomainError::Forbidden(
                "application does not match this event and participant".into(),
            ));
        }
        if !event.has_started(now) {
            return Err(DomainError::Forbidden(
                "refunds can only be requested once the event has started".into(),
            ));
        }
        if tx.refund_for_application(&application.id)?.is_some() {
            return Err(DomainError::Conflict(
                "a refund was already requested for this application".into(),
            ));
        }

        let request = RefundRequest::new(
            owner_id,
            event.id,
            application.id,
            claim.participant_user_id,
            claim.reason,
            claim.evidence_images,
        );
        tx.put_refund_request(&request)?;

        tracing::info!(
            target: "audit",
            severity = "medium",
            action = "refund_requested",
            refund_request_id = %request.id,
            event_id = %event.id,
            participant_user_id = %request.participant_user_id,
            "Refund request submitted"
        );

        Ok(request)
    }

    /// Decide a pending refund request. Approval restores the credit to the requester.
    ///
    /// # Errors
    ///
    /// - [`DomainError::Forbidden`] unless the reviewer is an admin
    /// - [`DomainError::NotFound`] for a missing request
    /// - [`DomainError::InvalidState`] unless the request is pending
    pub fn review(
        &self,
        tx: &mut dyn Tx,
        reviewer: &Actor,
        request_id: RefundRequestId,
        decision: RefundDecision,
        admin_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        require_admin(reviewer)?;

        let mut request = tx
            .refund_request(&request_id)?
            .ok_or_else(|| DomainError::not_found("refund request", request_id))?;
        if request.status != RefundStatus::Pending {
            return Err(DomainError::InvalidState(format!(
                "refund request is already {:?}",
                request.status
            )));
        }

        request.status = decision.into();
        request.admin_notes = admin_notes;
        request.reviewed_by = Some(reviewer.user_id);
        request.reviewed_at = Some(now);
        request.updated_at = now;

        if decision == RefundDecision::Approved {
            self.ledger.restore(
                tx,
                request.user_id,
                request.credits_to_refund,
                request.event_id,
                request.application_id,
                "Refund for participant no-show",
            )?;
            request.processed_at = Some(now);
        }
        tx.put_refund_request(&request)?;

        tracing::info!(
            target: "audit",
            severity = "medium",
            action = "refund_reviewed",
            refund_request_id = %request.id,
            reviewer_id = %reviewer.user_id,
            decision = ?decision,
            "Refund request reviewed"
        );

        Ok(ReviewOutcome {
            success: true,
            decision,
        })
    }

    /// Requests filed by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn requests_for_user(&self, tx: &dyn Tx, user_id: UserId) -> Result<Vec<RefundRequest>> {
        Ok(tx.refund_requests_for_user(&user_id)?)
    }

    /// All requests, optionally in one status, oldest first. Admin only.
    ///
    /// # Errors
    ///
    /// [`DomainError::Forbidden`] unless the caller is an admin.
    pub fn requests_by_status(
        &self,
        tx: &dyn Tx,
        reviewer: &Actor,
        status: Option<RefundStatus>,
    ) -> Result<Vec<RefundRequest>> {
        require_admin(reviewer)?;
        let mut requests = tx.all_refund_requests()?;
        if let Some(status) = status {
            requests.retain(|request| request.status == status);
        }
        Ok(requests)
    }
}

fn require_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(DomainError::Forbidden(
            "refund review requires the admin role".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rendezvous_core::{ApplicationDecision, Event, NewEvent};
    use rendezvous_store::Database;

    use crate::applications::ApplicationWorkflow;
    use crate::events::EventLifecycle;

    struct Fixture {
        db: Database,
        ledger: Arc<Ledger>,
        refunds: RefundReview,
        owner: UserId,
        guest: UserId,
        event: Event,
        application_id: ApplicationId,
    }

    /// An owner whose event started at `start_time` with one approved guest.
    fn fixture(start_time: DateTime<Utc>) -> Fixture {
        let db = Database::in_memory();
        let ledger = Arc::new(Ledger::default());
        let workflow = Arc::new(ApplicationWorkflow::new(Arc::clone(&ledger)));
        let events = EventLifecycle::new(Arc::clone(&ledger), Arc::clone(&workflow));
        let refunds = RefundReview::new(Arc::clone(&ledger));
        let owner = UserId::generate();
        let guest = UserId::generate();

        let (event, application_id) = db
            .transaction(|tx| {
                ledger.initialize(tx, owner)?;
                let event = events.create(
                    tx,
                    owner,
                    NewEvent {
                        title: "Karaoke".into(),
                        room_title: None,
                        start_time,
                        end_time: None,
                        max_guests: Some(2),
                        min_age: None,
                        max_age: None,
                    },
                    Utc::now(),
                )?;
                let application = workflow.apply(tx, guest, event.id, None, Utc::now())?;
                workflow.respond(
                    tx,
                    owner,
                    application.id,
                    ApplicationDecision::Approved,
                    None,
                    Utc::now(),
                )?;
                Ok::<_, DomainError>((event, application.id))
            })
            .unwrap();

        Fixture {
            db,
            ledger,
            refunds,
            owner,
            guest,
            event,
            application_id,
        }
    }

    impl Fixture {
        fn claim(&self) -> RefundClaim {
            RefundClaim {
                event_id: self.event.id,
                application_id: self.application_id,
                participant_user_id: self.guest,
                reason: "Never showed up".into(),
                evidence_images: vec!["storage/evidence-1.jpg".into()],
            }
        }

        fn submit(&self, caller: UserId, claim: RefundClaim) -> Result<RefundRequest> {
            self.db
                .transaction(|tx| self.refunds.submit(tx, caller, claim, Utc::now()))
        }

        fn review(
            &self,
            reviewer: &Actor,
            request_id: RefundRequestId,
            decision: RefundDecision,
        ) -> Result<ReviewOutcome> {
            self.db.transaction(|tx| {
                self.refunds
                    .review(tx, reviewer, request_id, decision, None, Utc::now())
            })
        }
    }

    #[test]
    fn approved_refund_restores_one_credit() {
        let f = fixture(Utc::now() - Duration::hours(2));
        let before = f
            .db
            .transaction(|tx| f.ledger.balance(tx, f.owner))
            .unwrap();
        assert_eq!(before.total_used, 1);

        let request = f.submit(f.owner, f.claim()).unwrap();
        assert_eq!(request.status, RefundStatus::Pending);
        assert_eq!(request.credits_to_refund, 1);

        let admin = Actor::admin(UserId::generate());
        let outcome = f
            .review(&admin, request.id, RefundDecision::Approved)
            .unwrap();
        assert_eq!(outcome.decision, RefundDecision::Approved);

        let after = f
            .db
            .transaction(|tx| f.ledger.balance(tx, f.owner))
            .unwrap();
        assert_eq!(after.available_credits, before.available_credits + 1);
        assert_eq!(after.total_used, 0);

        let stored = f
            .db
            .transaction(|tx| tx.refund_request(&request.id))
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RefundStatus::Approved);
        assert_eq!(stored.reviewed_by, Some(admin.user_id));
        assert!(stored.processed_at.is_some());

        // Only one request per application, whatever its state.
        assert!(matches!(
            f.submit(f.owner, f.claim()),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn rejected_refund_changes_no_balance() {
        let f = fixture(Utc::now() - Duration::hours(2));
        let request = f.submit(f.owner, f.claim()).unwrap();

        f.review(&Actor::admin(UserId::generate()), request.id, RefundDecision::Rejected)
            .unwrap();

        let balance = f
            .db
            .transaction(|tx| f.ledger.balance(tx, f.owner))
            .unwrap();
        assert_eq!(balance.total_used, 1);

        let err = f
            .review(&Actor::admin(UserId::generate()), request.id, RefundDecision::Approved)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn review_requires_admin() {
        let f = fixture(Utc::now() - Duration::hours(2));
        let request = f.submit(f.owner, f.claim()).unwrap();

        let err = f
            .review(&Actor::member(f.owner), request.id, RefundDecision::Approved)
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = f
            .db
            .transaction(|tx| f.refunds.requests_by_status(tx, &Actor::member(f.owner), None))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn future_event_cannot_be_refunded() {
        let f = fixture(Utc::now() + Duration::days(1));
        assert!(matches!(
            f.submit(f.owner, f.claim()),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn claim_must_match_owner_and_participant() {
        let f = fixture(Utc::now() - Duration::hours(2));

        assert!(matches!(
            f.submit(f.guest, f.claim()),
            Err(DomainError::Forbidden(_))
        ));

        let mut wrong_participant = f.claim();
        wrong_participant.participant_user_id = UserId::generate();
        assert!(matches!(
            f.submit(f.owner, wrong_participant),
            Err(DomainError::Forbidden(_))
        ));

        let mut missing = f.claim();
        missing.application_id = ApplicationId::generate();
        assert!(matches!(
            f.submit(f.owner, missing),
            Err(DomainError::NotFound { .. })
        ));
    }

    #[test]
    fn listings_filter_by_requester_and_status() {
        let f = fixture(Utc::now() - Duration::hours(2));
        let request = f.submit(f.owner, f.claim()).unwrap();
        let admin = Actor::admin(UserId::generate());

        f.db.transaction(|tx| {
            assert_eq!(f.refunds.requests_for_user(tx, f.owner)?.len(), 1);
            assert!(f.refunds.requests_for_user(tx, f.guest)?.is_empty());

            let pending = f
                .refunds
                .requests_by_status(tx, &admin, Some(RefundStatus::Pending))?;
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].id, request.id);
            assert!(f
                .refunds
                .requests_by_status(tx, &admin, Some(RefundStatus::Approved))?
                .is_empty());
            Ok::<_, DomainError>(())
        })
        .unwrap();
    }
}
