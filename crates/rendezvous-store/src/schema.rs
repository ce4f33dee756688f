//! Column families.
//!
//! Primary records are keyed by their 16-byte id. Index families are keyed by
//! `parent_id || child_id` with an empty value unless noted.

/// Column family names.
pub mod cf {
    /// Credit accounts, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Credit holds, keyed by `event_id` (one hold per event).
    pub const HOLDS: &str = "holds";

    /// Index: holds by owner, keyed by `user_id || event_id`.
    pub const HOLDS_BY_USER: &str = "holds_by_user";

    /// Ledger transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// Processed payment references, keyed by the gateway id. Value is the transaction id.
    pub const PAYMENTS: &str = "payments";

    /// Events, keyed by `event_id`.
    pub const EVENTS: &str = "events";

    /// Index: events by owner, keyed by `owner_id || event_id`.
    pub const EVENTS_BY_OWNER: &str = "events_by_owner";

    /// Profiles, keyed by `user_id`.
    pub const PROFILES: &str = "profiles";

    /// Event applications, keyed by `application_id`.
    pub const APPLICATIONS: &str = "applications";

    /// Index: applications by event, keyed by `event_id || application_id`.
    pub const APPLICATIONS_BY_EVENT: &str = "applications_by_event";

    /// Index: applications by applicant, keyed by `applicant_id || application_id`.
    pub const APPLICATIONS_BY_APPLICANT: &str = "applications_by_applicant";

    /// Unique index: `event_id || applicant_id`. Value is the application id.
    pub const APPLICATION_BY_PAIR: &str = "application_by_pair";

    /// Connections, keyed by `user_a || user_b` as inserted.
    pub const CONNECTIONS: &str = "connections";

    /// Index: connections by user, keyed by `user_id || connection_id`. Value is the pair key.
    pub const CONNECTIONS_BY_USER: &str = "connections_by_user";

    /// Chat participants, keyed by `event_id || user_id`.
    pub const CHAT_PARTICIPANTS: &str = "chat_participants";

    /// Refund requests, keyed by `refund_request_id`.
    pub const REFUND_REQUESTS: &str = "refund_requests";

    /// Unique index: `application_id`. Value is the refund request id.
    pub const REFUND_BY_APPLICATION: &str = "refund_by_application";

    /// Index: refund requests by requester, keyed by `user_id || refund_request_id`.
    pub const REFUNDS_BY_USER: &str = "refunds_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::HOLDS,
        cf::HOLDS_BY_USER,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::PAYMENTS,
        cf::EVENTS,
        cf::EVENTS_BY_OWNER,
        cf::PROFILES,
        cf::APPLICATIONS,
        cf::APPLICATIONS_BY_EVENT,
        cf::APPLICATIONS_BY_APPLICANT,
        cf::APPLICATION_BY_PAIR,
        cf::CONNECTIONS,
        cf::CONNECTIONS_BY_USER,
        cf::CHAT_PARTICIPANTS,
        cf::REFUND_REQUESTS,
        cf::REFUND_BY_APPLICATION,
        cf::REFUNDS_BY_USER,
    ]
}
