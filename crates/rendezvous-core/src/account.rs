//! Credit account types.
//!
//! A credit account holds a user's spendable and reserved connection credits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Credits granted to every new account.
pub const WELCOME_GRANT_CREDITS: u32 = 4;

/// Per-user credit balances.
///
/// `available_credits + held_credits` only changes through a purchase, the
/// welcome grant, a refund, a hold, a deduction or a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAccount {
    /// Owner of the account.
    pub user_id: UserId,

    /// Credits spendable now.
    pub available_credits: u32,

    /// Credits reserved against open events.
    pub held_credits: u32,

    /// Lifetime credits purchased.
    pub total_purchased: u32,

    /// Lifetime credits consumed by approvals (net of refunds).
    pub total_used: u32,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When a balance last changed.
    pub last_updated: DateTime<Utc>,
}

impl CreditAccount {
    /// Create an empty account.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            available_credits: 0,
            held_credits: 0,
            total_purchased: 0,
            total_used: 0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Check whether `required` credits can be held right now.
    #[must_use]
    pub fn has_sufficient_credits(&self, required: u32) -> bool {
        self.available_credits >= required
    }

    /// Mark the account as modified.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Read-only projection of a credit account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBalance {
    /// Credits spendable now.
    pub available_credits: u32,
    /// Credits reserved against open events.
    pub held_credits: u32,
    /// Lifetime credits purchased.
    pub total_purchased: u32,
    /// Lifetime credits consumed.
    pub total_used: u32,
    /// Last balance change, `None` when the user has no account yet.
    pub last_updated: Option<DateTime<Utc>>,
}

impl From<&CreditAccount> for CreditBalance {
    fn from(account: &CreditAccount) -> Self {
        Self {
            available_credits: account.available_credits,
            held_credits: account.held_credits,
            total_purchased: account.total_purchased,
            total_used: account.total_used,
            last_updated: Some(account.last_updated),
        }
    }
}

/// Answer to "can this user hold `required` credits?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sufficiency {
    /// Whether the available balance covers the requirement.
    pub sufficient: bool,
    /// Credits available now.
    pub available: u32,
    /// Credits asked about.
    pub required: u32,
    /// Missing credits, zero when sufficient.
    pub shortfall: u32,
}

impl Sufficiency {
    /// Compare an available balance against a requirement.
    #[must_use]
    pub const fn check(available: u32, required: u32) -> Self {
        Self {
            sufficient: available >= required,
            available,
            required,
            shortfall: required.saturating_sub(available),
        }
    }
}
