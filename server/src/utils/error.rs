use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;
use crate::utils::response::error as error_response;

/// Per-field validation messages, keyed by field name (`non_field_errors` for cross-field rules).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Top-level message for every rejected event update.
pub const UPDATE_FAILED: &str = "Validation failed during update.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError { message: String, errors: FieldErrors },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Not enabled: {0}")]
    NotEnabled(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Event full: {0}")]
    EventFull(String),

    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(#[source] StoreError),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, errors: FieldErrors) -> Self {
        AppError::ValidationError {
            message: message.into(),
            errors,
        }
    }

    /// Validation failure on a single field.
    pub fn invalid_field(
        message: impl Into<String>,
        field: &str,
        detail: impl Into<String>,
    ) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![detail.into()]);
        Self::validation(message, errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotEnabled(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::EventFull(_) => StatusCode::CONFLICT,
            AppError::AlreadyRegistered(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::NotEnabled(_) => "NOT_ENABLED",
            AppError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            AppError::EventFull(_) => "EVENT_FULL",
            AppError::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::ServiceUnavailable(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::ValidationError { errors, .. } => {
                warn!(code = self.code(), ?errors, "Request rejected");
            }
            _ => {
                warn!(code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!(
                "Sorry, {what} was not found. Please check the ID and try again."
            )),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::EventFull { .. } => AppError::EventFull(
                "Sorry, event is full. New attendees can not be registered.".to_string(),
            ),
            StoreError::AlreadyRegistered { .. } => AppError::AlreadyRegistered(
                "Attendee already registered for this event. Please try with a different email."
                    .to_string(),
            ),
            StoreError::CapacityBelowRegistrations { registered } => AppError::invalid_field(
                UPDATE_FAILED,
                "max_capacity",
                format!("Capacity cannot be lower than the {registered} existing registrations."),
            ),
            err @ (StoreError::Database(_) | StoreError::Migration(_)) => {
                AppError::DatabaseError(err)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, errors) = match self {
            AppError::ValidationError { message, errors } => (message, json!(errors)),
            AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::NotEnabled(msg)
            | AppError::MethodNotAllowed(msg)
            | AppError::EventFull(msg)
            | AppError::AlreadyRegistered(msg)
            | AppError::Conflict(msg)
            | AppError::ServiceUnavailable(msg) => (msg, Value::Array(Vec::new())),
            AppError::DatabaseError(_) => (
                "A database error occurred".to_string(),
                Value::Array(Vec::new()),
            ),
            AppError::InternalServerError(_) => (
                "An unexpected error occurred".to_string(),
                Value::Array(Vec::new()),
            ),
        };

        error_response(code, public_message, errors, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_http_semantics() {
        let cases = [
            (
                StoreError::NotFound("event 1".into()),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                StoreError::EventFull { event_id: 1 },
                StatusCode::CONFLICT,
                "EVENT_FULL",
            ),
            (
                StoreError::AlreadyRegistered {
                    event_id: 1,
                    email: "a@example.com".into(),
                },
                StatusCode::CONFLICT,
                "ALREADY_REGISTERED",
            ),
            (
                StoreError::Conflict("name".into()),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                StoreError::CapacityBelowRegistrations { registered: 3 },
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                StoreError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
            ),
        ];

        for (store_err, status, code) in cases {
            let app_err = AppError::from(store_err);
            assert_eq!(app_err.status_code(), status);
            assert_eq!(app_err.code(), code);
        }
    }

    #[test]
    fn test_invalid_field_builds_single_entry() {
        let err = AppError::invalid_field("bad", "email", "Enter a valid email address.");
        match err {
            AppError::ValidationError { message, errors } => {
                assert_eq!(message, "bad");
                assert_eq!(errors["email"], vec!["Enter a valid email address."]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_capacity_shrink_uses_update_message() {
        match AppError::from(StoreError::CapacityBelowRegistrations { registered: 4 }) {
            AppError::ValidationError { message, errors } => {
                assert_eq!(message, UPDATE_FAILED);
                assert!(errors.contains_key("max_capacity"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed_status() {
        let err = AppError::MethodNotAllowed("DELETE /events/1/".into());
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(err.code(), "METHOD_NOT_ALLOWED");
    }
}
