use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::state_machine::{ActorRole, BookingStatus, TransitionEvent};

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid pricing input: {0}")]
    InvalidPricingInput(String),

    #[error("Dates unavailable: listing {listing_id} is already reserved within {start}..{end}")]
    RangeConflict {
        listing_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Cannot {event} a booking that is {from}")]
    IllegalTransition {
        from: BookingStatus,
        event: TransitionEvent,
    },

    #[error("A {role} is not allowed to {event} this booking")]
    Unauthorized {
        role: ActorRole,
        event: TransitionEvent,
    },

    #[error("Booking {id} changed concurrently: expected {expected}, found {actual}")]
    StatusChanged {
        id: Uuid,
        expected: BookingStatus,
        actual: BookingStatus,
    },

    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Listing not found: {0}")]
    ListingNotFound(Uuid),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Timed out waiting for the availability lock of listing {listing_id}, try again")]
    LockTimeout { listing_id: Uuid },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    /// Only lock contention is transient; everything else is the caller's to fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::LockTimeout { .. })
    }

    /// Machine-readable identifier for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidRange(_) => "INVALID_RANGE",
            BookingError::InvalidPricingInput(_) => "INVALID_PRICING_INPUT",
            BookingError::RangeConflict { .. } => "RANGE_CONFLICT",
            BookingError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            BookingError::Unauthorized { .. } => "UNAUTHORIZED",
            BookingError::StatusChanged { .. } => "STATUS_CHANGED",
            BookingError::NotFound(_) => "BOOKING_NOT_FOUND",
            BookingError::ListingNotFound(_) => "LISTING_NOT_FOUND",
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::LockTimeout { .. } => "LOCK_TIMEOUT",
            BookingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Numeric code for logs and monitoring
    pub fn numeric_code(&self) -> i32 {
        match self {
            BookingError::InvalidRange(_) => 4001,
            BookingError::InvalidPricingInput(_) => 4002,
            BookingError::Validation(_) => 4003,
            BookingError::Unauthorized { .. } => 4030,
            BookingError::NotFound(_) => 4041,
            BookingError::ListingNotFound(_) => 4042,
            BookingError::RangeConflict { .. } => 4091,
            BookingError::IllegalTransition { .. } => 4092,
            BookingError::StatusChanged { .. } => 4093,
            BookingError::LockTimeout { .. } => 5031,
            BookingError::Internal(_) => 5000,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidRange(_)
            | BookingError::InvalidPricingInput(_)
            | BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) | BookingError::ListingNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::RangeConflict { .. }
            | BookingError::IllegalTransition { .. }
            | BookingError::StatusChanged { .. } => StatusCode::CONFLICT,
            BookingError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for BookingError {
    fn from(err: ValidationErrors) -> Self {
        BookingError::Validation(err.to_string())
    }
}

/// JSON body returned for every failed request
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Numeric code, e.g. `4091`
    pub code: i32,
    /// Stable identifier, e.g. `RANGE_CONFLICT`
    #[schema(value_type = String)]
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl From<&BookingError> for ErrorResponse {
    fn from(err: &BookingError) -> Self {
        Self {
            code: err.numeric_code(),
            error: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error_code = self.numeric_code(), error = %self, "Booking request failed");
        } else {
            tracing::info!(error_code = self.numeric_code(), error = %self, "Booking request rejected");
        }

        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_lock_timeout_is_retryable() {
        let timeout = BookingError::LockTimeout {
            listing_id: Uuid::nil(),
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let conflict = BookingError::RangeConflict {
            listing_id: Uuid::nil(),
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 3).unwrap(),
        };
        assert!(!conflict.is_retryable());
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_messages_are_user_facing() {
        let err = BookingError::IllegalTransition {
            from: BookingStatus::Cancelled,
            event: TransitionEvent::Cancel,
        };
        assert_eq!(err.to_string(), "Cannot cancel a booking that is cancelled");

        let err = BookingError::Unauthorized {
            role: ActorRole::Renter,
            event: TransitionEvent::Approve,
        };
        assert_eq!(err.to_string(), "A renter is not allowed to approve this booking");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_response_body() {
        let err = BookingError::NotFound(Uuid::nil());
        let body = ErrorResponse::from(&err);
        assert_eq!(body.code, 4041);
        assert_eq!(body.error, "BOOKING_NOT_FOUND");
        assert!(!body.retryable);
    }
}
