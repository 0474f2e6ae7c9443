use axum::http::{HeaderValue, Request, Response};
use std::{
    env,
    task::{Context, Poll},
};
use tower::{Layer, Service};

/// Security header names
const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
const X_FRAME_OPTIONS: &str = "x-frame-options";
const STRICT_TRANSPORT_SECURITY: &str = "strict-transport-security";
const CONTENT_SECURITY_POLICY: &str = "content-security-policy";
const REFERRER_POLICY: &str = "referrer-policy";
const PERMISSIONS_POLICY: &str = "permissions-policy";

/// Security header values
const NOSNIFF: &str = "nosniff";
const DENY: &str = "DENY";
const SAMEORIGIN: &str = "SAMEORIGIN";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";
const CSP_API_VALUE: &str = "default-src 'none'; frame-ancestors 'none'";
// Swagger UI and ReDoc ship inline scripts/styles and load web workers.
const CSP_DOCS_VALUE: &str = "default-src 'self'; script-src 'self' 'unsafe-inline' https://cdn.redoc.ly; \
     style-src 'self' 'unsafe-inline' https://fonts.googleapis.com; \
     font-src 'self' https://fonts.gstatic.com; img-src 'self' data: https://cdn.redoc.ly; \
     worker-src 'self' blob:; frame-ancestors 'self'";
const REFERRER_POLICY_VALUE: &str = "strict-origin-when-cross-origin";
const PERMISSIONS_POLICY_VALUE: &str = "geolocation=(), microphone=(), camera=()";

/// Path prefixes served as HTML documentation rather than JSON.
const DOCS_PATH_PREFIXES: [&str; 2] = ["/swagger", "/redoc"];

#[derive(Clone)]
pub struct SecurityHeadersLayer {
    include_hsts: bool,
}

impl SecurityHeadersLayer {
    pub fn new(include_hsts: bool) -> Self {
        Self { include_hsts }
    }

    pub fn from_env() -> Self {
        let is_production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        if is_production {
            tracing::info!("Security: HSTS header enabled (production mode)");
        } else {
            tracing::info!("Security: HSTS header disabled (development mode)");
        }

        Self::new(is_production)
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            include_hsts: self.include_hsts,
        }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    include_hsts: bool,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for SecurityHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = SecurityHeadersFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let path = request.uri().path();
        let serves_docs = DOCS_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix));

        SecurityHeadersFuture {
            future: self.inner.call(request),
            include_hsts: self.include_hsts,
            serves_docs,
        }
    }
}

#[pin_project::pin_project]
pub struct SecurityHeadersFuture<F> {
    #[pin]
    future: F,
    include_hsts: bool,
    serves_docs: bool,
}

impl<F, ResBody, E> std::future::Future for SecurityHeadersFuture<F>
where
    F: std::future::Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.future.poll(cx) {
            Poll::Ready(Ok(mut response)) => {
                let headers = response.headers_mut();

                headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static(NOSNIFF));
                headers.insert(REFERRER_POLICY, HeaderValue::from_static(REFERRER_POLICY_VALUE));
                headers.insert(PERMISSIONS_POLICY, HeaderValue::from_static(PERMISSIONS_POLICY_VALUE));
                if *this.serves_docs {
                    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static(SAMEORIGIN));
                    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP_DOCS_VALUE));
                } else {
                    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static(DENY));
                    headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(CSP_API_VALUE));
                }

                // Only add HSTS in production (HTTPS environments)
                if *this.include_hsts {
                    headers.insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static(HSTS_VALUE));
                }

                Poll::Ready(Ok(response))
            }
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }
}

pub fn create_security_headers_layer() -> SecurityHeadersLayer {
    SecurityHeadersLayer::from_env()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    async fn headers_for(path: &str, include_hsts: bool) -> axum::http::HeaderMap {
        let service = SecurityHeadersLayer::new(include_hsts).layer(tower::service_fn(
            |_request: Request<()>| async { Ok::<_, Infallible>(Response::new(())) },
        ));
        let request = Request::builder().uri(path).body(()).unwrap();
        service.oneshot(request).await.unwrap().headers().clone()
    }

    #[test]
    fn test_security_headers_layer_creation() {
        let layer = SecurityHeadersLayer::new(false);
        assert!(!layer.include_hsts);

        let layer_with_hsts = SecurityHeadersLayer::new(true);
        assert!(layer_with_hsts.include_hsts);
    }

    #[tokio::test]
    async fn test_api_responses_get_strict_policy() {
        let headers = headers_for("/events/", false).await;
        assert_eq!(headers[CONTENT_SECURITY_POLICY], HeaderValue::from_static(CSP_API_VALUE));
        assert_eq!(headers[X_FRAME_OPTIONS], HeaderValue::from_static(DENY));
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], HeaderValue::from_static(NOSNIFF));
        assert!(headers.get(STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[tokio::test]
    async fn test_docs_pages_get_relaxed_policy() {
        let headers = headers_for("/swagger/index.html", true).await;
        assert_eq!(headers[CONTENT_SECURITY_POLICY], HeaderValue::from_static(CSP_DOCS_VALUE));
        assert_eq!(headers[X_FRAME_OPTIONS], HeaderValue::from_static(SAMEORIGIN));
        assert_eq!(headers[STRICT_TRANSPORT_SECURITY], HeaderValue::from_static(HSTS_VALUE));
    }
}
