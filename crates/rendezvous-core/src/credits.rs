//! Credit transaction types.
//!
//! Every ledger-affecting change appends one immutable transaction. The log is
//! an audit trail only; balances live on [`CreditAccount`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApplicationId, CreditAccount, EventId, TransactionId, UserId};

/// An audit record of one balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Type of transaction.
    pub transaction_type: TransactionType,

    /// Signed amount. Negative for holds and deductions.
    pub amount: i64,

    /// Event the change relates to.
    pub related_event_id: Option<EventId>,

    /// Application the change relates to.
    pub related_application_id: Option<ApplicationId>,

    /// Payment gateway reference for purchases.
    pub payment_transaction_id: Option<String>,

    /// Human-readable description.
    pub description: String,

    /// Available balance after the change.
    pub available_after: u32,

    /// Held balance after the change.
    pub held_after: u32,

    /// When the transaction was recorded.
    pub timestamp: DateTime<Utc>,
}

impl CreditTransaction {
    fn entry(
        account: &CreditAccount,
        transaction_type: TransactionType,
        amount: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id: account.user_id,
            transaction_type,
            amount,
            related_event_id: None,
            related_application_id: None,
            payment_transaction_id: None,
            description,
            available_after: account.available_credits,
            held_after: account.held_credits,
            timestamp: Utc::now(),
        }
    }

    /// Welcome grant on account creation.
    #[must_use]
    pub fn initial_grant(account: &CreditAccount, credits: u32) -> Self {
        Self::entry(
            account,
            TransactionType::InitialGrant,
            i64::from(credits),
            format!("Welcome grant of {credits} connection credits"),
        )
    }

    /// Credits bought through the payment gateway.
    #[must_use]
    pub fn purchase(
        account: &CreditAccount,
        credits: u32,
        payment_transaction_id: String,
        description: String,
    ) -> Self {
        let mut tx = Self::entry(
            account,
            TransactionType::Purchase,
            i64::from(credits),
            description,
        );
        tx.payment_transaction_id = Some(payment_transaction_id);
        tx
    }

    /// Credits reserved for an event. Always negative.
    #[must_use]
    pub fn hold(account: &CreditAccount, event_id: EventId, credits: u32, description: String) -> Self {
        Self::entry(account, TransactionType::Hold, -i64::from(credits), description)
            .with_event(event_id)
    }

    /// One held credit consumed by an approval. Always `-1`.
    #[must_use]
    pub fn deduction(
        account: &CreditAccount,
        event_id: EventId,
        application_id: ApplicationId,
    ) -> Self {
        Self::entry(
            account,
            TransactionType::Deduction,
            -1,
            "Connection credit used for approved application".to_string(),
        )
        .with_event(event_id)
        .with_application(application_id)
    }

    /// Unused held credits returned to the available balance.
    #[must_use]
    pub fn release(
        account: &CreditAccount,
        event_id: EventId,
        credits: u32,
        description: String,
    ) -> Self {
        Self::entry(account, TransactionType::Release, i64::from(credits), description)
            .with_event(event_id)
    }

    /// Consumed credits restored after an approved refund request.
    #[must_use]
    pub fn refund(
        account: &CreditAccount,
        credits: u32,
        event_id: EventId,
        application_id: ApplicationId,
        description: String,
    ) -> Self {
        Self::entry(account, TransactionType::Refund, i64::from(credits), description)
            .with_event(event_id)
            .with_application(application_id)
    }

    #[must_use]
    fn with_event(mut self, event_id: EventId) -> Self {
        self.related_event_id = Some(event_id);
        self
    }

    #[must_use]
    fn with_application(mut self, application_id: ApplicationId) -> Self {
        self.related_application_id = Some(application_id);
        self
    }
}

/// Type of credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Credits bought.
    Purchase,
    /// Held credit consumed by an approval.
    Deduction,
    /// Consumed credit restored.
    Refund,
    /// Welcome credits.
    InitialGrant,
    /// Credits reserved for an event.
    Hold,
    /// Unused held credits returned.
    Release,
}

impl TransactionType {
    /// Check if this transaction type adds to the available balance.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(
            self,
            Self::Purchase | Self::Refund | Self::InitialGrant | Self::Release
        )
    }

    /// Check if this transaction type takes from a balance.
    #[must_use]
    pub const fn is_debit(&self) -> bool {
        matches!(self, Self::Hold | Self::Deduction)
    }

    /// The snake_case name used in storage and the API.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Deduction => "deduction",
            Self::Refund => "refund",
            Self::InitialGrant => "initial_grant",
            Self::Hold => "hold",
            Self::Release => "release",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> CreditAccount {
        let mut account = CreditAccount::new(UserId::generate());
        account.available_credits = 2;
        account.held_credits = 2;
        account
    }

    #[test]
    fn hold_amount_is_negative() {
        let event_id = EventId::generate();
        let tx = CreditTransaction::hold(&account(), event_id, 2, "Hold".into());

        assert_eq!(tx.amount, -2);
        assert_eq!(tx.transaction_type, TransactionType::Hold);
        assert_eq!(tx.related_event_id, Some(event_id));
        assert_eq!(tx.available_after, 2);
        assert_eq!(tx.held_after, 2);
    }

    #[test]
    fn deduction_links_application() {
        let application_id = ApplicationId::generate();
        let tx = CreditTransaction::deduction(&account(), EventId::generate(), application_id);

        assert_eq!(tx.amount, -1);
        assert_eq!(tx.related_application_id, Some(application_id));
    }

    #[test]
    fn purchase_keeps_payment_reference() {
        let tx = CreditTransaction::purchase(&account(), 10, "pi_123".into(), "Bought".into());
        assert_eq!(tx.amount, 10);
        assert_eq!(tx.payment_transaction_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn transaction_type_direction() {
        assert!(TransactionType::Purchase.is_credit());
        assert!(TransactionType::Release.is_credit());
        assert!(TransactionType::Refund.is_credit());
        assert!(TransactionType::InitialGrant.is_credit());
        assert!(TransactionType::Hold.is_debit());
        assert!(TransactionType::Deduction.is_debit());
        assert!(!TransactionType::Hold.is_credit());
    }

    #[test]
    fn type_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionType::InitialGrant).unwrap();
        assert_eq!(json, "\"initial_grant\"");
        assert_eq!(TransactionType::InitialGrant.as_str(), "initial_grant");
    }
}
