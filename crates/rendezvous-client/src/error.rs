//! Client error types.

use rendezvous_core::EventId;

/// Errors that can occur when using the rendezvous client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Not enough available credits.
    #[error("insufficient credits: required={required}, available={available}")]
    InsufficientCredits {
        /// Credits asked for.
        required: u32,
        /// Credits available.
        available: u32,
        /// Missing credits.
        shortfall: u32,
    },

    /// Every guest slot of the event is taken.
    #[error("event is full: max_guests={max_guests}")]
    EventFull {
        /// The event's capacity.
        max_guests: u32,
    },

    /// Every credit of the event's hold has been consumed.
    #[error("credit hold exhausted: credits_held={credits_held}")]
    HoldExhausted {
        /// The event whose hold is used up, when the server named it.
        event_id: Option<EventId>,
        /// Size of the hold.
        credits_held: u32,
    },

    /// The record is not in a state that allows the operation.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Server message naming the state.
        message: String,
    },

    /// The operation clashes with an existing record.
    #[error("conflict: {message}")]
    Conflict {
        /// Server message naming the clash.
        message: String,
    },

    /// The addressed record does not exist.
    #[error("not found: {message}")]
    NotFound {
        /// Server message naming the record.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}
