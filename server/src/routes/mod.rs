use axum::{
    extract::OriginalUri,
    http::Method,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::docs;
use crate::handlers::{admin, attendees, events, health_check};
use crate::state::AppState;
use crate::utils::error::AppError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn create_routes(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        });

    let admin_routes = Router::new()
        .route("/admin/events/", get(admin::list_all_events))
        .route("/admin/events/:event_id/", delete(admin::delete_event))
        .route(
            "/admin/attendees/:attendee_id/",
            delete(admin::delete_attendee),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/events/",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/events/:event_id/",
            get(events::get_event).put(events::update_event),
        )
        .route(
            "/events/:event_id/register/",
            post(attendees::register_attendee),
        )
        .route(
            "/events/:event_id/attendees/",
            get(attendees::list_attendees),
        )
        .merge(admin_routes)
        .merge(docs::router())
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .with_state(state)
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::MethodNotAllowed(format!("{method} {}", uri.path()))
}
