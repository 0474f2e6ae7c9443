use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod admin;
pub mod attendees;
pub mod events;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthPayload {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "gather-api")]
    pub service: String,
    /// Storage backend serving requests.
    #[schema(example = "postgres")]
    pub storage: String,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service and store are up", body = crate::utils::response::HealthResponse),
        (status = 503, description = "Store unreachable", body = crate::utils::response::ApiErrorResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Response, AppError> {
    state.store.health_check().await.map_err(|err| {
        tracing::error!(error = %err, "Store health check failed");
        AppError::ServiceUnavailable("Storage backend is unavailable.".to_string())
    })?;

    let payload = HealthPayload {
        status: "ok".to_string(),
        service: "gather-api".to_string(),
        storage: state.store.backend_name().to_string(),
    };
    Ok(success(payload, "Health check successful").into_response())
}
