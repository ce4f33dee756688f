//! API handlers.
//!
//! Each handler runs its domain operation as exactly one database transaction.

use std::str::FromStr;

use rendezvous_core::IdError;

use crate::error::ApiError;

pub mod accounts;
pub mod admin;
pub mod applications;
pub mod connections;
pub mod credits;
pub mod events;
pub mod health;
pub mod profiles;
pub mod refunds;

/// Parse an identifier taken from the request path.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = IdError>,
{
    raw.parse()
        .map_err(|e: IdError| ApiError::BadRequest(e.to_string()))
}
