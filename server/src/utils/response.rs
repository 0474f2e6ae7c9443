use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use crate::handlers::HealthPayload;
use crate::models::{Attendee, EventView};
use crate::utils::pagination::PaginationMeta;

#[derive(Serialize, ToSchema)]
#[aliases(
    EventResponse = ApiResponse<EventView>,
    AttendeeResponse = ApiResponse<Attendee>,
    HealthResponse = ApiResponse<HealthPayload>
)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Serialize, ToSchema)]
#[aliases(
    EventPageResponse = PaginatedResponse<EventView>,
    AttendeePageResponse = PaginatedResponse<Attendee>
)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub message: String,
    pub pagination: PaginationMeta,
    pub data: Vec<T>,
}

#[derive(Serialize, ToSchema)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    /// Field name to messages for validation failures, otherwise an empty list.
    #[schema(value_type = Object)]
    pub errors: Value,
}

pub fn success<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    with_status(StatusCode::OK, data, message)
}

pub fn created<T>(data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    with_status(StatusCode::CREATED, data, message)
}

fn with_status<T>(status: StatusCode, data: T, message: impl Into<String>) -> impl IntoResponse
where
    T: Serialize,
{
    let body = ApiResponse {
        success: true,
        message: message.into(),
        data,
    };
    (status, Json(body))
}

pub fn paginated<T>(
    data: Vec<T>,
    pagination: PaginationMeta,
    message: impl Into<String>,
) -> impl IntoResponse
where
    T: Serialize,
{
    let body = PaginatedResponse {
        success: true,
        message: message.into(),
        pagination,
        data,
    };
    (StatusCode::OK, Json(body))
}

pub fn error(code: &str, message: impl Into<String>, errors: Value, status: StatusCode) -> Response {
    let body = ApiErrorResponse {
        success: false,
        code: code.to_string(),
        message: message.into(),
        errors,
    };

    (status, Json(body)).into_response()
}
