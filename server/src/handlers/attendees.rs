use axum::extract::{OriginalUri, State};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::handlers::events::not_found_as;
use crate::models::NewAttendee;
use crate::state::AppState;
use crate::utils::extract::{ApiPath, ApiQuery};
use crate::utils::error::AppError;
use crate::utils::pagination::{PageQuery, Pagination};
use crate::utils::response::{created, paginated};
use crate::utils::validated_json::ValidatedJson;

const REGISTER_FAILED: &str = "Failed to register attendee. Please check the name and email.";
const EVENT_MISSING: &str = "Event does not exist. Please check the event ID and try again.";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegistrationRequest {
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    #[schema(example = "Jane Smith")]
    pub name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
}

impl RegistrationRequest {
    fn into_new_attendee(self) -> Result<NewAttendee, AppError> {
        let name = self.name.unwrap_or_default();
        if name.trim().is_empty() {
            return Err(AppError::invalid_field(
                REGISTER_FAILED,
                "name",
                "This field may not be blank.",
            ));
        }
        let email = self.email.unwrap_or_default();
        Ok(NewAttendee::new(&name, &email))
    }
}

#[utoipa::path(
    post,
    path = "/events/{event_id}/register/",
    tag = "attendees",
    request_body = RegistrationRequest,
    params(("event_id" = i64, Path, description = "Event to register for")),
    responses(
        (status = 201, description = "Attendee registered", body = crate::utils::response::AttendeeResponse),
        (status = 400, description = "Invalid name or email", body = crate::utils::response::ApiErrorResponse),
        (status = 404, description = "Event not found", body = crate::utils::response::ApiErrorResponse),
        (status = 409, description = "Event full or email already registered", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn register_attendee(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
    ValidatedJson(body): ValidatedJson<RegistrationRequest>,
) -> Result<Response, AppError> {
    let attendee = body.into_new_attendee()?;
    let registered = state
        .store
        .register_attendee(event_id, attendee)
        .await
        .map_err(not_found_as(EVENT_MISSING))?;

    tracing::info!(
        event_id,
        attendee_id = registered.id,
        "Attendee registered"
    );
    Ok(created(registered, "Attendee registered successfully!").into_response())
}

#[utoipa::path(
    get,
    path = "/events/{event_id}/attendees/",
    tag = "attendees",
    params(
        ("event_id" = i64, Path, description = "Event whose attendees are listed"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Attendees in registration order", body = crate::utils::response::AttendeePageResponse),
        (status = 404, description = "Event not found or invalid page", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn list_attendees(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    let pagination = Pagination::from_query(&query)?;
    let page = state
        .store
        .list_attendees(event_id, pagination.window())
        .await
        .map_err(not_found_as(EVENT_MISSING))?;
    pagination.ensure_in_range(page.total)?;

    let message = if page.total > 0 {
        "Event attendees fetched successfully."
    } else {
        "No event attendees found."
    };
    Ok(paginated(page.items, pagination.meta(uri.path(), page.total), message).into_response())
}
