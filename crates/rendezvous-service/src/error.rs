//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use rendezvous_core::DomainError;
use rendezvous_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Valid credentials but insufficient permissions.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A domain rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// HTTP status for each domain error family.
fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DomainError::NotFound { .. } | DomainError::NoActiveHold { .. } => StatusCode::NOT_FOUND,
        DomainError::Forbidden(_)
        | DomainError::AgeRestricted { .. }
        | DomainError::DateOfBirthRequired => StatusCode::FORBIDDEN,
        DomainError::Conflict(_)
        | DomainError::AlreadyExists
        | DomainError::DuplicatePayment { .. }
        | DomainError::InvalidState(_)
        | DomainError::HoldExhausted { .. }
        | DomainError::EventFull { .. } => StatusCode::CONFLICT,
        DomainError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::LedgerInconsistency(_) | DomainError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Structured fields callers can act on.
fn domain_details(err: &DomainError) -> Option<serde_json::Value> {
    match err {
        DomainError::InsufficientCredits {
            required,
            available,
            shortfall,
        } => Some(serde_json::json!({
            "required": required,
            "available": available,
            "shortfall": shortfall
        })),
        DomainError::EventFull { max_guests } => Some(serde_json::json!({
            "max_guests": max_guests
        })),
        DomainError::AgeRestricted {
            age,
            min_age,
            max_age,
        } => Some(serde_json::json!({
            "age": age,
            "min_age": min_age,
            "max_age": max_age
        })),
        DomainError::HoldExhausted {
            event_id,
            credits_held,
        } => Some(serde_json::json!({
            "event_id": event_id,
            "credits_held": credits_held
        })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Domain(err) => {
                let status = domain_status(err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "Internal server error");
                    (
                        status,
                        err.code(),
                        "An internal error occurred".to_string(),
                        None,
                    )
                } else {
                    (status, err.code(), err.to_string(), domain_details(err))
                }
            }
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rendezvous_core::EventId;

    #[test]
    fn domain_families_map_to_statuses() {
        let cases = [
            (DomainError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                DomainError::NoActiveHold {
                    event_id: EventId::generate(),
                },
                StatusCode::NOT_FOUND,
            ),
            (DomainError::DateOfBirthRequired, StatusCode::FORBIDDEN),
            (DomainError::AlreadyExists, StatusCode::CONFLICT),
            (
                DomainError::InsufficientCredits {
                    required: 2,
                    available: 1,
                    shortfall: 1,
                },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (DomainError::EventFull { max_guests: 1 }, StatusCode::CONFLICT),
            (
                DomainError::InvalidInput("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Storage("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn shortfall_is_reported_in_details() {
        let details = domain_details(&DomainError::InsufficientCredits {
            required: 3,
            available: 1,
            shortfall: 2,
        })
        .unwrap();
        assert_eq!(details["shortfall"], 2);
    }
}
