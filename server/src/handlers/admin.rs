//! Operator endpoints. Every route here sits behind [`crate::auth::require_admin`].
use axum::extract::{OriginalUri, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::handlers::events::not_found_as;
use crate::models::EventView;
use crate::state::AppState;
use crate::utils::extract::{ApiPath, ApiQuery};
use crate::utils::error::AppError;
use crate::utils::pagination::{PageQuery, Pagination};
use crate::utils::response::paginated;
use crate::utils::timezone::ClientTimezone;

#[utoipa::path(
    get,
    path = "/admin/events/",
    tag = "admin",
    params(
        PageQuery,
        ("X-Timezone" = Option<String>, Header, description = "IANA zone used to render times, defaults to UTC")
    ),
    responses(
        (status = 200, description = "All events, past ones included", body = crate::utils::response::EventPageResponse),
        (status = 401, description = "Missing bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 403, description = "Wrong bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 404, description = "Admin API disabled or invalid page", body = crate::utils::response::ApiErrorResponse)
    ),
    security(("admin_token" = []))
)]
pub async fn list_all_events(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    timezone: ClientTimezone,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Response, AppError> {
    let pagination = Pagination::from_query(&query)?;
    let page = state.store.list_events(pagination.window()).await?;
    pagination.ensure_in_range(page.total)?;

    let data = page
        .items
        .iter()
        .map(|summary| EventView::render(summary, &timezone))
        .collect();
    Ok(paginated(
        data,
        pagination.meta(uri.path(), page.total),
        "Events fetched successfully.",
    )
    .into_response())
}

#[utoipa::path(
    delete,
    path = "/admin/events/{event_id}/",
    tag = "admin",
    params(("event_id" = i64, Path, description = "Event to delete along with its attendees")),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 401, description = "Missing bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 403, description = "Wrong bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 404, description = "Event not found or admin API disabled", body = crate::utils::response::ApiErrorResponse)
    ),
    security(("admin_token" = []))
)]
pub async fn delete_event(
    State(state): State<AppState>,
    ApiPath(event_id): ApiPath<i64>,
) -> Result<Response, AppError> {
    state
        .store
        .delete_event(event_id)
        .await
        .map_err(not_found_as("Event not found."))?;
    tracing::info!(event_id, "Event deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    delete,
    path = "/admin/attendees/{attendee_id}/",
    tag = "admin",
    params(("attendee_id" = i64, Path, description = "Registration to delete")),
    responses(
        (status = 204, description = "Registration deleted"),
        (status = 401, description = "Missing bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 403, description = "Wrong bearer token", body = crate::utils::response::ApiErrorResponse),
        (status = 404, description = "Attendee not found or admin API disabled", body = crate::utils::response::ApiErrorResponse)
    ),
    security(("admin_token" = []))
)]
pub async fn delete_attendee(
    State(state): State<AppState>,
    ApiPath(attendee_id): ApiPath<i64>,
) -> Result<Response, AppError> {
    state
        .store
        .delete_attendee(attendee_id)
        .await
        .map_err(not_found_as("Attendee not found."))?;
    tracing::info!(attendee_id, "Attendee deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}
