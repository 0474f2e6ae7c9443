//! Static bearer-token gate for the admin routes.
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;
use crate::utils::error::AppError;

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(AppError::NotEnabled(
            "Admin API is disabled. Set ADMIN_TOKEN to enable it.".to_string(),
        ));
    };

    let presented = bearer_token(request.headers())?;
    if !constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "Rejected admin token");
        return Err(AppError::Forbidden("Invalid admin token.".to_string()));
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let missing = || AppError::AuthError("Missing or malformed bearer token.".to_string());

    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| missing())?;

    let mut parts = value.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().map(str::trim).unwrap_or_default();

    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        tracing::warn!("Invalid auth scheme: {scheme}");
        return Err(missing());
    }
    Ok(token)
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer s3cret")).unwrap(), "s3cret");
        assert_eq!(bearer_token(&headers("bearer s3cret")).unwrap(), "s3cret");
        assert!(matches!(
            bearer_token(&headers("Basic dXNlcjpwYXNz")),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            bearer_token(&headers("Bearer ")),
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"token", b"token"));
        assert!(!constant_time_eq(b"token", b"tokem"));
        assert!(!constant_time_eq(b"token", b"token-longer"));
        assert!(!constant_time_eq(b"", b"x"));
    }
}
