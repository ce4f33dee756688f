//! The connection-credit ledger.
//!
//! The ledger is the only writer of credit accounts, holds and ledger
//! transactions. Every operation runs inside the caller's transaction, so a
//! balance change commits or aborts together with the caller's own writes.
//!
//! Balances live on the account record. Transactions are history only and are
//! never summed to recompute a balance.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use rendezvous_core::{
    ApplicationId, CreditAccount, CreditBalance, CreditHold, CreditTransaction, DomainError,
    EventId, HoldStatus, Result, Sufficiency, UserId, WELCOME_GRANT_CREDITS,
};
use rendezvous_store::{Records, Tx};

/// Result of [`Ledger::hold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Credits moved from available to held.
    pub credits_held: u32,
}

/// Result of [`Ledger::deduct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductOutcome {
    /// Always `true`; failures are errors.
    pub success: bool,
    /// Held credits consumed, always 1.
    pub credits_deducted: u32,
}

/// Result of [`Ledger::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// `true` unless the call failed.
    pub success: bool,
    /// Unused held credits returned to available.
    pub credits_released: u32,
}

/// Per-user credit balances and per-event holds.
#[derive(Debug, Clone)]
pub struct Ledger {
    welcome_grant: u32,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(WELCOME_GRANT_CREDITS)
    }
}

impl Ledger {
    /// Create a ledger that grants `welcome_grant` credits to new accounts.
    #[must_use]
    pub const fn new(welcome_grant: u32) -> Self {
        Self { welcome_grant }
    }

    /// Open a credit account with the welcome grant.
    ///
    /// # Errors
    ///
    /// [`DomainError::AlreadyExists`] if the user already has an account.
    pub fn initialize(&self, tx: &mut dyn Tx, user_id: UserId) -> Result<CreditAccount> {
        if tx.account(&user_id)?.is_some() {
            return Err(DomainError::AlreadyExists);
        }

        let mut account = CreditAccount::new(user_id);
        account.available_credits = self.welcome_grant;

        tx.put_account(&account)?;
        tx.append_transaction(&CreditTransaction::initial_grant(
            &account,
            self.welcome_grant,
        ))?;

        tracing::info!(
            user_id = %user_id,
            credits = self.welcome_grant,
            "Credit account initialized"
        );

        Ok(account)
    }

    /// Reserve one credit per guest slot of an event.
    ///
    /// A user without an account has a zero balance.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] if `max_guests` is zero
    /// - [`DomainError::Forbidden`] if the event is on record and hosted by someone else
    /// - [`DomainError::Conflict`] if the event already had a hold, active or released
    /// - [`DomainError::InsufficientCredits`] if fewer than `max_guests` credits are available
    pub fn hold(
        &self,
        tx: &mut dyn Tx,
        user_id: UserId,
        event_id: EventId,
        max_guests: u32,
        event_title: Option<&str>,
    ) -> Result<HoldOutcome> {
        if max_guests == 0 {
            return Err(DomainError::InvalidInput(
                "max_guests must be at least 1".into(),
            ));
        }
        if let Some(event) = tx.event(&event_id)? {
            if event.owner_id != user_id {
                return Err(DomainError::Forbidden(
                    "only the event owner can hold credits for it".into(),
                ));
            }
        }
        if tx.hold_for_event(&event_id)?.is_some() {
            return Err(DomainError::Conflict(format!(
                "event {event_id} already has a credit hold"
            )));
        }

        let mut account = tx
            .account(&user_id)?
            .unwrap_or_else(|| CreditAccount::new(user_id));

        let check = Sufficiency::check(account.available_credits, max_guests);
        if !check.sufficient {
            return Err(DomainError::InsufficientCredits {
                required: check.required,
                available: check.available,
                shortfall: check.shortfall,
            });
        }

        account.available_credits = debit(account.available_credits, max_guests, "available")?;
        account.held_credits = credit(account.held_credits, max_guests, "held")?;
        account.touch();

        let hold = CreditHold::new(user_id, event_id, max_guests);
        let description = match event_title {
            Some(title) => format!("Held {max_guests} credits for \"{title}\""),
            None => format!("Held {max_guests} credits for event"),
        };

        tx.put_account(&account)?;
        tx.put_hold(&hold)?;
        tx.append_transaction(&CreditTransaction::hold(
            &account,
            event_id,
            max_guests,
            description,
        ))?;

        tracing::info!(
            user_id = %user_id,
            event_id = %event_id,
            credits_held = max_guests,
            available_after = account.available_credits,
            "Credits held for event"
        );

        Ok(HoldOutcome {
            success: true,
            credits_held: max_guests,
        })
    }

    /// Consume one held credit for an approved application.
    ///
    /// # Errors
    ///
    /// - [`DomainError::NoActiveHold`] if the user has no active hold for the event
    /// - [`DomainError::HoldExhausted`] if every held credit was already used
    pub fn deduct(
        &self,
        tx: &mut dyn Tx,
        user_id: UserId,
        event_id: EventId,
        application_id: ApplicationId,
    ) -> Result<DeductOutcome> {
        let mut hold =
            active_hold(tx, &user_id, &event_id)?.ok_or(DomainError::NoActiveHold { event_id })?;
        if hold.is_exhausted() {
            return Err(DomainError::HoldExhausted {
                event_id,
                credits_held: hold.credits_held,
            });
        }

        let mut account = account_for_hold(tx, &hold)?;
        hold.credits_used = credit(hold.credits_used, 1, "used")?;
        account.held_credits = debit(account.held_credits, 1, "held")?;
        account.total_used = credit(account.total_used, 1, "total used")?;
        account.touch();

        tx.put_hold(&hold)?;
        tx.put_account(&account)?;
        tx.append_transaction(&CreditTransaction::deduction(
            &account,
            event_id,
            application_id,
        ))?;

        tracing::info!(
            user_id = %user_id,
            event_id = %event_id,
            application_id = %application_id,
            credits_used = hold.credits_used,
            credits_held = hold.credits_held,
            "Held credit deducted"
        );

        Ok(DeductOutcome {
            success: true,
            credits_deducted: 1,
        })
    }

    /// Return the unused part of an event's hold and close it.
    ///
    /// Releasing twice never credits twice: the second call finds no active hold.
    ///
    /// # Errors
    ///
    /// [`DomainError::NoActiveHold`] if there is no active hold and
    /// `throw_on_missing_hold` is set. Otherwise a missing hold releases nothing.
    pub fn release(
        &self,
        tx: &mut dyn Tx,
        user_id: UserId,
        event_id: EventId,
        description: Option<&str>,
        throw_on_missing_hold: bool,
    ) -> Result<ReleaseOutcome> {
        let Some(mut hold) = active_hold(tx, &user_id, &event_id)? else {
            if throw_on_missing_hold {
                return Err(DomainError::NoActiveHold { event_id });
            }
            tracing::debug!(user_id = %user_id, event_id = %event_id, "No active hold to release");
            return Ok(ReleaseOutcome {
                success: true,
                credits_released: 0,
            });
        };

        let unused = hold.unused();
        if unused > 0 {
            let mut account = account_for_hold(tx, &hold)?;
            account.held_credits = debit(account.held_credits, unused, "held")?;
            account.available_credits = credit(account.available_credits, unused, "available")?;
            account.touch();

            let description = description.map_or_else(
                || format!("Released {unused} unused held credits"),
                str::to_string,
            );
            tx.put_account(&account)?;
            tx.append_transaction(&CreditTransaction::release(
                &account,
                event_id,
                unused,
                description,
            ))?;
        }

        hold.status = HoldStatus::Released;
        hold.released_at = Some(Utc::now());
        tx.put_hold(&hold)?;

        tracing::info!(
            user_id = %user_id,
            event_id = %event_id,
            credits_released = unused,
            credits_used = hold.credits_used,
            "Credit hold released"
        );

        Ok(ReleaseOutcome {
            success: true,
            credits_released: unused,
        })
    }

    /// Give back consumed credits after an approved refund request.
    ///
    /// `total_used` is reduced by `amount`, never below zero.
    ///
    /// # Errors
    ///
    /// [`DomainError::InvalidInput`] if `amount` is zero.
    pub fn restore(
        &self,
        tx: &mut dyn Tx,
        user_id: UserId,
        amount: u32,
        event_id: EventId,
        application_id: ApplicationId,
        description: &str,
    ) -> Result<CreditAccount> {
        if amount == 0 {
            return Err(DomainError::InvalidInput(
                "refund amount must be at least 1".into(),
            ));
        }

        let mut account = tx
            .account(&user_id)?
            .unwrap_or_else(|| CreditAccount::new(user_id));
        account.available_credits = credit(account.available_credits, amount, "available")?;
        account.total_used = account.total_used.saturating_sub(amount);
        account.touch();

        tx.put_account(&account)?;
        tx.append_transaction(&CreditTransaction::refund(
            &account,
            amount,
            event_id,
            application_id,
            description.to_string(),
        ))?;

        tracing::info!(
            user_id = %user_id,
            event_id = %event_id,
            application_id = %application_id,
            amount,
            "Credits restored"
        );

        Ok(account)
    }

    /// Add credits bought through the payment gateway.
    ///
    /// Each payment reference is credited at most once.
    ///
    /// # Errors
    ///
    /// - [`DomainError::InvalidInput`] for zero credits or an empty payment reference
    /// - [`DomainError::DuplicatePayment`] if the payment was already credited
    pub fn purchase(
        &self,
        tx: &mut dyn Tx,
        user_id: UserId,
        credits: u32,
        payment_transaction_id: &str,
        description: Option<&str>,
    ) -> Result<CreditAccount> {
        if credits == 0 {
            return Err(DomainError::InvalidInput(
                "purchase must add at least 1 credit".into(),
            ));
        }
        if payment_transaction_id.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "payment_transaction_id is required".into(),
            ));
        }
        if tx.payment_recorded(payment_transaction_id)? {
            return Err(DomainError::DuplicatePayment {
                payment_transaction_id: payment_transaction_id.to_string(),
            });
        }

        let mut account = tx
            .account(&user_id)?
            .unwrap_or_else(|| CreditAccount::new(user_id));
        account.available_credits = credit(account.available_credits, credits, "available")?;
        account.total_purchased = credit(account.total_purchased, credits, "total purchased")?;
        account.touch();

        let description = description.map_or_else(
            || format!("Purchased {credits} connection credits"),
            str::to_string,
        );
        tx.put_account(&account)?;
        tx.append_transaction(&CreditTransaction::purchase(
            &account,
            credits,
            payment_transaction_id.to_string(),
            description,
        ))?;

        tracing::info!(
            user_id = %user_id,
            credits,
            payment_transaction_id = %payment_transaction_id,
            available_after = account.available_credits,
            "Credits purchased"
        );

        Ok(account)
    }

    /// Current balances, all zero when the user has no account.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn balance(&self, tx: &dyn Tx, user_id: UserId) -> Result<CreditBalance> {
        Ok(tx
            .account(&user_id)?
            .as_ref()
            .map(CreditBalance::from)
            .unwrap_or_default())
    }

    /// Whether the user could hold `required` credits right now.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn sufficient_for(&self, tx: &dyn Tx, user_id: UserId, required: u32) -> Result<Sufficiency> {
        let balance = self.balance(tx, user_id)?;
        Ok(Sufficiency::check(balance.available_credits, required))
    }

    /// Ledger history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn transactions(
        &self,
        tx: &dyn Tx,
        user_id: UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        Ok(tx.transactions_for_user(&user_id, limit, offset)?)
    }

    /// Every hold the user placed, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn holds(&self, tx: &dyn Tx, user_id: UserId) -> Result<Vec<CreditHold>> {
        Ok(tx.holds_for_user(&user_id)?)
    }
}

/// The event's hold, if it is active and belongs to `user_id`.
fn active_hold(tx: &dyn Tx, user_id: &UserId, event_id: &EventId) -> Result<Option<CreditHold>> {
    Ok(tx
        .hold_for_event(event_id)?
        .filter(|hold| hold.is_active() && hold.user_id == *user_id))
}

fn account_for_hold(tx: &dyn Tx, hold: &CreditHold) -> Result<CreditAccount> {
    tx.account(&hold.user_id)?.ok_or_else(|| {
        DomainError::LedgerInconsistency(format!(
            "hold for event {} has no credit account",
            hold.event_id
        ))
    })
}

fn debit(balance: u32, amount: u32, field: &str) -> Result<u32> {
    balance.checked_sub(amount).ok_or_else(|| {
        DomainError::LedgerInconsistency(format!(
            "{field} credits would go negative ({balance} - {amount})"
        ))
    })
}

fn credit(balance: u32, amount: u32, field: &str) -> Result<u32> {
    balance.checked_add(amount).ok_or_else(|| {
        DomainError::LedgerInconsistency(format!(
            "{field} credits overflow ({balance} + {amount})"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::{Event, NewEvent, TransactionType};
    use rendezvous_store::Database;

    fn setup() -> (Database, Ledger, UserId) {
        let db = Database::in_memory();
        let ledger = Ledger::default();
        let user_id = UserId::generate();
        db.transaction(|tx| ledger.initialize(tx, user_id)).unwrap();
        (db, ledger, user_id)
    }

    fn balance(db: &Database, ledger: &Ledger, user_id: UserId) -> CreditBalance {
        db.transaction(|tx| ledger.balance(tx, user_id)).unwrap()
    }

    #[test]
    fn initialize_grants_welcome_credits_once() {
        let (db, ledger, user_id) = setup();

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.available_credits, 4);
        assert_eq!(b.held_credits, 0);

        let err = db
            .transaction(|tx| ledger.initialize(tx, user_id))
            .unwrap_err();
        assert_eq!(err, DomainError::AlreadyExists);

        let history = db
            .transaction(|tx| ledger.transactions(tx, user_id, 10, 0))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_type, TransactionType::InitialGrant);
        assert_eq!(history[0].amount, 4);
    }

    #[test]
    fn hold_then_release_restores_balances() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();
        let before = balance(&db, &ledger, user_id);

        let held = db
            .transaction(|tx| ledger.hold(tx, user_id, event_id, 3, Some("Picnic")))
            .unwrap();
        assert_eq!(held.credits_held, 3);

        let during = balance(&db, &ledger, user_id);
        assert_eq!(during.available_credits, 1);
        assert_eq!(during.held_credits, 3);

        let released = db
            .transaction(|tx| ledger.release(tx, user_id, event_id, None, true))
            .unwrap();
        assert_eq!(released.credits_released, 3);

        let after = balance(&db, &ledger, user_id);
        assert_eq!(after.available_credits, before.available_credits);
        assert_eq!(after.held_credits, before.held_credits);
    }

    #[test]
    fn release_returns_only_unused_credits() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        db.transaction(|tx| ledger.hold(tx, user_id, event_id, 3, None))
            .unwrap();
        for _ in 0..2 {
            db.transaction(|tx| ledger.deduct(tx, user_id, event_id, ApplicationId::generate()))
                .unwrap();
        }

        let released = db
            .transaction(|tx| ledger.release(tx, user_id, event_id, None, true))
            .unwrap();
        assert_eq!(released.credits_released, 1);

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.available_credits, 2);
        assert_eq!(b.held_credits, 0);
        assert_eq!(b.total_used, 2);

        let holds = db.transaction(|tx| ledger.holds(tx, user_id)).unwrap();
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].status, HoldStatus::Released);
        assert_eq!(holds[0].credits_used, 2);
    }

    #[test]
    fn second_release_never_double_credits() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        db.transaction(|tx| ledger.hold(tx, user_id, event_id, 2, None))
            .unwrap();
        db.transaction(|tx| ledger.release(tx, user_id, event_id, None, true))
            .unwrap();

        let quiet = db
            .transaction(|tx| ledger.release(tx, user_id, event_id, None, false))
            .unwrap();
        assert_eq!(quiet.credits_released, 0);

        let err = db
            .transaction(|tx| ledger.release(tx, user_id, event_id, None, true))
            .unwrap_err();
        assert_eq!(err, DomainError::NoActiveHold { event_id });

        assert_eq!(balance(&db, &ledger, user_id).available_credits, 4);
    }

    #[test]
    fn second_hold_for_event_conflicts() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        db.transaction(|tx| ledger.hold(tx, user_id, event_id, 1, None))
            .unwrap();
        let err = db
            .transaction(|tx| ledger.hold(tx, user_id, event_id, 1, None))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // A released hold still blocks a new one.
        db.transaction(|tx| ledger.release(tx, user_id, event_id, None, true))
            .unwrap();
        let err = db
            .transaction(|tx| ledger.hold(tx, user_id, event_id, 1, None))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn hold_on_another_users_event_is_forbidden() {
        let (db, ledger, owner) = setup();
        let intruder = UserId::generate();
        db.transaction(|tx| ledger.initialize(tx, intruder)).unwrap();

        let event = Event::new(
            owner,
            NewEvent {
                title: "Supper".into(),
                room_title: None,
                start_time: Utc::now(),
                end_time: None,
                max_guests: Some(2),
                min_age: None,
                max_age: None,
            },
        );
        db.transaction(|tx| -> Result<()> {
            tx.put_event(&event)?;
            Ok(())
        })
        .unwrap();

        let err = db
            .transaction(|tx| ledger.hold(tx, intruder, event.id, 2, None))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        assert_eq!(balance(&db, &ledger, intruder).available_credits, 4);
        assert!(db
            .transaction(|tx| -> Result<_> { Ok(tx.hold_for_event(&event.id)?) })
            .unwrap()
            .is_none());

        db.transaction(|tx| ledger.hold(tx, owner, event.id, 2, None))
            .unwrap();
        assert_eq!(balance(&db, &ledger, owner).held_credits, 2);
    }

    #[test]
    fn hold_reports_shortfall() {
        let (db, ledger, user_id) = setup();

        let err = db
            .transaction(|tx| ledger.hold(tx, user_id, EventId::generate(), 6, None))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientCredits {
                required: 6,
                available: 4,
                shortfall: 2,
            }
        );
        assert_eq!(balance(&db, &ledger, user_id).available_credits, 4);
    }

    #[test]
    fn hold_without_account_is_insufficient() {
        let db = Database::in_memory();
        let ledger = Ledger::default();

        let err = db
            .transaction(|tx| ledger.hold(tx, UserId::generate(), EventId::generate(), 1, None))
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientCredits { available: 0, .. }
        ));
    }

    #[test]
    fn hold_rejects_zero_guests() {
        let (db, ledger, user_id) = setup();
        let err = db
            .transaction(|tx| ledger.hold(tx, user_id, EventId::generate(), 0, None))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn deduct_requires_active_hold() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        let err = db
            .transaction(|tx| ledger.deduct(tx, user_id, event_id, ApplicationId::generate()))
            .unwrap_err();
        assert_eq!(err, DomainError::NoActiveHold { event_id });

        // Someone else's hold does not count.
        db.transaction(|tx| ledger.hold(tx, user_id, event_id, 1, None))
            .unwrap();
        let err = db
            .transaction(|tx| {
                ledger.deduct(tx, UserId::generate(), event_id, ApplicationId::generate())
            })
            .unwrap_err();
        assert_eq!(err, DomainError::NoActiveHold { event_id });
    }

    #[test]
    fn deduct_on_exhausted_hold_fails() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        db.transaction(|tx| ledger.hold(tx, user_id, event_id, 1, None))
            .unwrap();
        db.transaction(|tx| ledger.deduct(tx, user_id, event_id, ApplicationId::generate()))
            .unwrap();

        let err = db
            .transaction(|tx| ledger.deduct(tx, user_id, event_id, ApplicationId::generate()))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::HoldExhausted {
                event_id,
                credits_held: 1,
            }
        );

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.held_credits, 0);
        assert_eq!(b.total_used, 1);
    }

    #[test]
    fn restore_clamps_total_used() {
        let (db, ledger, user_id) = setup();

        db.transaction(|tx| {
            ledger.restore(
                tx,
                user_id,
                1,
                EventId::generate(),
                ApplicationId::generate(),
                "No-show refund",
            )
        })
        .unwrap();

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.available_credits, 5);
        assert_eq!(b.total_used, 0);
    }

    #[test]
    fn purchase_is_idempotent_per_payment() {
        let (db, ledger, user_id) = setup();

        db.transaction(|tx| ledger.purchase(tx, user_id, 10, "pi_123", None))
            .unwrap();
        let err = db
            .transaction(|tx| ledger.purchase(tx, user_id, 10, "pi_123", None))
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicatePayment { .. }));

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.available_credits, 14);
        assert_eq!(b.total_purchased, 10);
    }

    #[test]
    fn purchase_creates_missing_account() {
        let db = Database::in_memory();
        let ledger = Ledger::default();
        let user_id = UserId::generate();

        db.transaction(|tx| ledger.purchase(tx, user_id, 3, "pi_new", Some("Starter pack")))
            .unwrap();
        assert_eq!(balance(&db, &ledger, user_id).available_credits, 3);
    }

    #[test]
    fn balance_of_unknown_user_is_zero() {
        let db = Database::in_memory();
        let ledger = Ledger::default();
        let user_id = UserId::generate();

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b, CreditBalance::default());

        let check = db
            .transaction(|tx| ledger.sufficient_for(tx, user_id, 2))
            .unwrap();
        assert!(!check.sufficient);
        assert_eq!(check.shortfall, 2);
    }

    #[test]
    fn failed_operation_leaves_no_partial_writes() {
        let (db, ledger, user_id) = setup();
        let event_id = EventId::generate();

        let result = db.transaction(|tx| {
            ledger.hold(tx, user_id, event_id, 2, None)?;
            ledger.deduct(tx, user_id, EventId::generate(), ApplicationId::generate())
        });
        assert!(result.is_err());

        let b = balance(&db, &ledger, user_id);
        assert_eq!(b.available_credits, 4);
        assert_eq!(b.held_credits, 0);
        let holds = db.transaction(|tx| ledger.holds(tx, user_id)).unwrap();
        assert!(holds.is_empty());
    }
}
