use axum::extract::{OriginalUri, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{EventView, NewEvent};
use crate::state::AppState;
use crate::store::StoreError;
use crate::utils::extract::{ApiPath, ApiQuery};
use crate::utils::error::{AppError, FieldErrors, NON_FIELD_ERRORS, UPDATE_FAILED};
use crate::utils::pagination::{PageQuery, Pagination};
use crate::utils::response::{created, paginated, success};
use crate::utils::timezone::{parse_client_datetime, ClientTimezone};
use crate::utils::validated_json::ValidatedJson;

const CREATE_FAILED: &str = "Failed to create event. Please correct the input data and try again.";
const EVENT_NOT_FOUND: &str = "Sorry, event not found. Please check the event ID and try again.";

/// Body of `POST /events/` and `PUT /events/{event_id}/`.
///
/// Times without an offset are read in the `X-Timezone` zone (UTC by default).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EventRequest {
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    #[schema(example = "RustConf")]
    pub name: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(max = 255, message = "Ensure this field has no more than 255 characters.")
    )]
    #[schema(example = "Montreal")]
    pub location: Option<String>,
    #[validate(required(message = "This field is required."))]
    #[schema(example = "2030-10-15 09:00:00")]
    pub start_time: Option<String>,
    #[validate(required(message = "This field is required."))]
    #[schema(example = "2030-10-17 17:00:00")]
    pub end_time: Option<String>,
    #[validate(
        required(message = "This field is required."),
        range(min = 0, message = "Ensure this value is greater than or equal to 0.")
    )]
    #[schema(example = 200, minimum = 0)]
    pub max_capacity: Option<i32>,
}

impl EventRequest {
    /// Applies the rules `validator` cannot express: non-blank text, parseable
    /// times, a start in the future and an end after the start.
    pub fn into_new_event(
        self,
        tz: Tz,
        now: DateTime<Utc>,
        message: &str,
    ) -> Result<NewEvent, AppError> {
        let mut errors = FieldErrors::new();

        let name = non_blank("name", self.name, &mut errors);
        let location = non_blank("location", self.location, &mut errors);
        let start_time = datetime_field("start_time", self.start_time, tz, &mut errors);
        let end_time = datetime_field("end_time", self.end_time, tz, &mut errors);

        if let Some(start) = start_time {
            if start <= now {
                push(&mut errors, "start_time", "Start time must be in the future.");
            }
        }
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if end <= start {
                push(&mut errors, NON_FIELD_ERRORS, "End time must be after start time.");
            }
        }
        if self.max_capacity.is_none() {
            push(&mut errors, "max_capacity", "This field is required.");
        }

        match (name, location, start_time, end_time, self.max_capacity) {
            (Some(name), Some(location), Some(start_time), Some(end_time), Some(max_capacity))
                if errors.is_empty() =>
            {
                Ok(NewEvent {
                    name,
                    location,
                    start_time,
                    end_time,
                    max_capacity,
                })
            }
            _ => Err(AppError::validation(message, errors)),
        }
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn non_blank(field: &str, value: Option<String>, errors: &mut FieldErrors) -> Option<String> {
    match value.map(|value| value.trim().to_string()) {
        Some(value) if !value.is_empty() => Some(value),
        Some(_) => {
            push(errors, field, "This field may not be blank.");
            None
        }
        None => {
            push(errors, field, "This field is required.");
            None
        }
    }
}

fn datetime_field(
    field: &str,
    value: Option<String>,
    tz: Tz,
    errors: &mut FieldErrors,
) -> Option<DateTime<Utc>> {
    let Some(raw) = value else {
        push(errors, field, "This field is required.");
        return None;
    };
    match parse_client_datetime(&raw, tz) {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            push(errors, field, &message);
            None
        }
    }
}

#[utoipa::path(
    get,
    path = "/events/",
    tag = "events",
    params(
        PageQuery,
        ("X-Timezone" = Option<String>, Header, description = "IANA zone used to render times, defaults to UTC")
    ),
    responses(
        (status = 200, description = "Upcoming events, newest first", body = crate::utils::response::EventPageResponse),
        (status = 404, description = "Invalid page", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    timezone: ClientTimezone,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    let pagination = Pagination::from_query(&query)?;
    let page = state
        .store
        .list_upcoming_events(Utc::now(), pagination.window())
        .await?;
    pagination.ensure_in_range(page.total)?;

    let message = if page.total > 0 {
        "Upcoming events fetched successfully."
    } else {
        "No upcoming events found."
    };
    let data = page
        .items
        .iter()
        .map(|summary| EventView::render(summary, &timezone))
        .collect();
    Ok(paginated(data, pagination.meta(uri.path(), page.total), message).into_response())
}

#[utoipa::path(
    post,
    path = "/events/",
    tag = "events",
    request_body = EventRequest,
    params(
        ("X-Timezone" = Option<String>, Header, description = "IANA zone for times without an offset")
    ),
    responses(
        (status = 201, description = "Event created", body = crate::utils::response::EventResponse),
        (status = 400, description = "Invalid event data", body = crate::utils::response::ApiErrorResponse),
        (status = 409, description = "An event with this name already exists", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    timezone: ClientTimezone,
    ValidatedJson(body): ValidatedJson<EventRequest>,
) -> Result<Response, AppError> {
    let new_event = body.into_new_event(timezone.for_input()?, Utc::now(), CREATE_FAILED)?;
    let summary = state.store.create_event(new_event).await?;

    tracing::info!(event = %summary.event.display_name(), "Event created");
    Ok(created(
        EventView::render(&summary, &timezone),
        "Event created successfully.",
    )
    .into_response())
}

#[utoipa::path(
    get,
    path = "/events/{event_id}/",
    tag = "events",
    params(
        ("event_id" = i64, Path, description = "Event identifier"),
        ("X-Timezone" = Option<String>, Header, description = "IANA zone used to render times, defaults to UTC")
    ),
    responses(
        (status = 200, description = "Event details", body = crate::utils::response::EventResponse),
        (status = 404, description = "Event not found", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
    timezone: ClientTimezone,
) -> Result<Response, AppError> {
    let summary = state
        .store
        .get_event(event_id)
        .await
        .map_err(not_found_as(EVENT_NOT_FOUND))?;
    Ok(success(
        EventView::render(&summary, &timezone),
        "Event fetched successfully.",
    )
    .into_response())
}

#[utoipa::path(
    put,
    path = "/events/{event_id}/",
    tag = "events",
    request_body = EventRequest,
    params(
        ("event_id" = i64, Path, description = "Event identifier"),
        ("X-Timezone" = Option<String>, Header, description = "IANA zone for times without an offset")
    ),
    responses(
        (status = 200, description = "Event updated", body = crate::utils::response::EventResponse),
        (status = 400, description = "Invalid event data", body = crate::utils::response::ApiErrorResponse),
        (status = 404, description = "Event not found", body = crate::utils::response::ApiErrorResponse),
        (status = 409, description = "An event with this name already exists", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
    timezone: ClientTimezone,
    ValidatedJson(body): ValidatedJson<EventRequest>,
) -> Result<Response, AppError> {
    let changes = body.into_new_event(timezone.for_input()?, Utc::now(), UPDATE_FAILED)?;
    let summary = state
        .store
        .update_event(event_id, changes)
        .await
        .map_err(not_found_as(EVENT_NOT_FOUND))?;

    tracing::info!(event = %summary.event.display_name(), "Event updated");
    Ok(success(
        EventView::render(&summary, &timezone),
        "Event updated successfully.",
    )
    .into_response())
}

/// Maps a store `NotFound` to a handler-specific message, leaving other errors as they are.
pub(crate) fn not_found_as(message: &'static str) -> impl Fn(StoreError) -> AppError {
    move |err| match err {
        StoreError::NotFound(_) => AppError::NotFound(message.to_string()),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(start: &str, end: &str, capacity: i32) -> EventRequest {
        EventRequest {
            name: Some("AI Summit".to_string()),
            location: Some("Bangalore".to_string()),
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            max_capacity: Some(capacity),
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn field_errors(err: AppError) -> FieldErrors {
        match err {
            AppError::ValidationError { errors, .. } => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_request_converts_to_utc() {
        let event = request("2030-07-25 12:00:00", "2030-07-27 18:30:00", 150)
            .into_new_event(chrono_tz::Asia::Kolkata, now(), CREATE_FAILED)
            .unwrap();
        assert_eq!(event.start_time.to_rfc3339(), "2030-07-25T06:30:00+00:00");
        assert_eq!(
            event.end_time - event.start_time,
            Duration::hours(54) + Duration::minutes(30)
        );
        assert_eq!(event.max_capacity, 150);
    }

    #[test]
    fn test_end_must_follow_start() {
        let err = request("2030-07-25 12:00:00", "2030-07-25 12:00:00", 10)
            .into_new_event(Tz::UTC, now(), CREATE_FAILED)
            .unwrap_err();
        let errors = field_errors(err);
        assert_eq!(errors[NON_FIELD_ERRORS], vec!["End time must be after start time."]);
    }

    #[test]
    fn test_start_must_be_in_the_future() {
        let err = request("2029-07-20 12:00:00", "2030-07-20 12:00:00", 10)
            .into_new_event(Tz::UTC, now(), CREATE_FAILED)
            .unwrap_err();
        let errors = field_errors(err);
        assert_eq!(errors["start_time"], vec!["Start time must be in the future."]);
    }

    #[test]
    fn test_blank_and_unparseable_fields_are_reported_together() {
        let mut body = request("soon", "2030-07-20 12:00:00", 10);
        body.name = Some("   ".to_string());
        let errors = field_errors(
            body.into_new_event(Tz::UTC, now(), CREATE_FAILED)
                .unwrap_err(),
        );
        assert_eq!(errors["name"], vec!["This field may not be blank."]);
        assert!(errors["start_time"][0].starts_with("Datetime has wrong format"));
    }

    #[test]
    fn test_validator_rules_cover_capacity_and_required_fields() {
        let mut body = request("2030-07-25 12:00:00", "2030-07-27 18:30:00", -5);
        body.location = None;
        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("max_capacity"));
        assert!(fields.contains_key("location"));
    }
}
