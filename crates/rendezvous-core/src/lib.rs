//! Core types for the rendezvous events service.
//!
//! This crate provides the domain records shared by the store and the service:
//!
//! - **Identifiers**: `UserId`, `EventId`, `ApplicationId`, `HoldId`, `TransactionId`, ...
//! - **Credits**: `CreditAccount`, `CreditHold`, `CreditTransaction`, `TransactionType`
//! - **Events**: `Event`, `Profile`
//! - **Applications**: `EventApplication`, `ApplicationStatus`, `Connection`, `ChatParticipant`
//! - **Refunds**: `RefundRequest`, `RefundStatus`
//! - **Errors**: `DomainError`
//!
//! # Connection credits
//!
//! An event owner reserves one credit per guest slot when the event is created.
//! Each approved applicant consumes one reserved credit; whatever is left over is
//! released back to the owner when the event is deleted or expires.
//!
//! - New user → 4 welcome credits
//! - Event with 2 guest slots → 2 available credits move to held
//! - Approve 1 applicant → 1 held credit is used
//! - Delete the event → the remaining held credit returns to available

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod actor;
pub mod application;
pub mod connection;
pub mod credits;
pub mod error;
pub mod event;
pub mod hold;
pub mod ids;
pub mod refund;

pub use account::{CreditAccount, CreditBalance, Sufficiency, WELCOME_GRANT_CREDITS};
pub use actor::{Actor, Role};
pub use application::{ApplicationDecision, ApplicationStatus, EventApplication};
pub use connection::{ChatParticipant, Connection, ParticipantRole};
pub use credits::{CreditTransaction, TransactionType};
pub use error::{DomainError, Result};
pub use event::{age_on, Event, EventStatus, NewEvent, Profile, DEFAULT_MAX_GUESTS};
pub use hold::{CreditHold, HoldStatus};
pub use ids::{
    ApplicationId, ConnectionId, EventId, HoldId, IdError, RefundRequestId, TransactionId, UserId,
};
pub use refund::{RefundDecision, RefundRequest, RefundStatus, REFUND_CREDITS};
