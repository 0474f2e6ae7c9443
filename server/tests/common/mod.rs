#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use gather_server::routes::create_routes;
use gather_server::state::AppState;
use gather_server::store::memory::InMemoryStore;
use gather_server::store::EventStore;

pub const ADMIN_TOKEN: &str = "test-admin-token";

pub fn app() -> Router {
    app_with_store(Arc::new(InMemoryStore::new()), Some(ADMIN_TOKEN))
}

pub fn app_with_store(store: Arc<dyn EventStore>, admin_token: Option<&str>) -> Router {
    create_routes(AppState::new(store, admin_token.map(String::from)))
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn with_header(mut request: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, value.parse().expect("header value"));
    request
}

pub async fn read_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn event_body(name: &str, capacity: i32) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "location": "Bangalore",
        "start_time": "2035-10-15 09:00:00",
        "end_time": "2035-10-17 17:00:00",
        "max_capacity": capacity
    })
}
