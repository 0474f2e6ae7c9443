//! OpenAPI document and the Swagger UI / ReDoc pages that render it.
use axum::response::Redirect;
use axum::routing::get;
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::attendees::RegistrationRequest;
use crate::handlers::events::EventRequest;
use crate::handlers::{admin, attendees, events, HealthPayload};
use crate::models::{Attendee, EventView};
use crate::utils::pagination::PaginationMeta;
use crate::utils::response::{
    ApiErrorResponse, AttendeePageResponse, AttendeeResponse, EventPageResponse, EventResponse,
    HealthResponse,
};

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "gather-api",
        version = "v1",
        description = "Event registration API: browse upcoming events, register attendees, manage events"
    ),
    paths(
        crate::handlers::health_check,
        events::list_events,
        events::create_event,
        events::get_event,
        events::update_event,
        attendees::register_attendee,
        attendees::list_attendees,
        admin::list_all_events,
        admin::delete_event,
        admin::delete_attendee
    ),
    components(schemas(
        EventRequest,
        RegistrationRequest,
        EventView,
        Attendee,
        HealthPayload,
        PaginationMeta,
        ApiErrorResponse,
        EventResponse,
        EventPageResponse,
        AttendeeResponse,
        AttendeePageResponse,
        HealthResponse
    )),
    modifiers(&AdminTokenScheme),
    tags(
        (name = "events", description = "Event listing and management"),
        (name = "attendees", description = "Registration and attendee lists"),
        (name = "admin", description = "Operator endpoints, bearer token required"),
        (name = "health", description = "Liveness and storage health")
    )
)]
pub struct ApiDoc;

struct AdminTokenScheme;

impl Modify for AdminTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Documentation routes; they carry no application state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger").url(OPENAPI_PATH, ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc/", ApiDoc::openapi()))
        .route("/redoc", get(|| async { Redirect::permanent("/redoc/") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/events/",
            "/events/{event_id}/",
            "/events/{event_id}/register/",
            "/events/{event_id}/attendees/",
            "/admin/events/",
            "/admin/events/{event_id}/",
            "/admin/attendees/{attendee_id}/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_admin_security_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("admin_token"));
    }
}
