//! Error types for rendezvous.

use crate::ids::{EventId, IdError};

/// Result type for rendezvous domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors raised by the ledger, the application workflow and the refund review.
///
/// Every error aborts the transaction it was raised in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// No caller identity.
    #[error("not authenticated")]
    Unauthenticated,

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The event has no active credit hold.
    #[error("no active credit hold for event {event_id}")]
    NoActiveHold {
        /// The event that was looked up.
        event_id: EventId,
    },

    /// The caller lacks the required relationship to the record.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The record already exists or clashes with an existing one.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user already has a credit account.
    #[error("credit account already exists")]
    AlreadyExists,

    /// The payment was already credited.
    #[error("payment already processed: {payment_transaction_id}")]
    DuplicatePayment {
        /// Payment gateway transaction id.
        payment_transaction_id: String,
    },

    /// Not enough available credits for a hold.
    #[error(
        "insufficient credits: required={required}, available={available}, shortfall={shortfall}"
    )]
    InsufficientCredits {
        /// Credits the operation needs.
        required: u32,
        /// Credits currently available.
        available: u32,
        /// `required - available`.
        shortfall: u32,
    },

    /// The record is not in the state the operation requires.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Every credit of the event's hold has already been used.
    #[error("credit hold exhausted for event {event_id}: {credits_held} credits already used")]
    HoldExhausted {
        /// The event whose hold is exhausted.
        event_id: EventId,
        /// Size of the hold.
        credits_held: u32,
    },

    /// The event has reached its guest capacity.
    #[error("event is full: {max_guests} guests already approved")]
    EventFull {
        /// Guest capacity of the event.
        max_guests: u32,
    },

    /// The applicant's age is outside the event's bounds.
    #[error("age {age} outside the allowed range for this event")]
    AgeRestricted {
        /// The applicant's age.
        age: u32,
        /// Lower bound, if any.
        min_age: Option<u32>,
        /// Upper bound, if any.
        max_age: Option<u32>,
    },

    /// The event is age-restricted and the applicant has no date of birth on file.
    #[error("date of birth required for age-restricted event")]
    DateOfBirthRequired,

    /// Malformed or out-of-range input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Stored balances would go negative. Indicates corrupted records.
    #[error("ledger inconsistency: {0}")]
    LedgerInconsistency(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// Shorthand for a [`DomainError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable snake_case code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound { .. } => "not_found",
            Self::NoActiveHold { .. } => "no_active_hold",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::AlreadyExists => "already_exists",
            Self::DuplicatePayment { .. } => "duplicate_payment",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::InvalidState(_) => "invalid_state",
            Self::HoldExhausted { .. } => "hold_exhausted",
            Self::EventFull { .. } => "event_full",
            Self::AgeRestricted { .. } => "age_restricted",
            Self::DateOfBirthRequired => "date_of_birth_required",
            Self::InvalidInput(_) => "invalid_input",
            Self::LedgerInconsistency(_) => "ledger_inconsistency",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl From<IdError> for DomainError {
    fn from(err: IdError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
