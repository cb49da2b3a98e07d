// SPDX-License-Identifier: MIT

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use campus_hub::config::Config;
use campus_hub::db::Database;
use campus_hub::routes::create_router;
use campus_hub::AppState;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Create a test app backed by the seeded in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = Database::with_seed_data();
    let state = Arc::new(AppState::new(config, db));
    (create_router(state.clone()), state)
}

/// POST a JSON body and return the response.
#[allow(dead_code)]
pub async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// GET with a bearer token and return the response.
#[allow(dead_code)]
pub async fn get_authed(app: &axum::Router, uri: &str, token: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

/// POST a JSON body with a bearer token and return the response.
#[allow(dead_code)]
pub async fn post_json_authed(
    app: &axum::Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Register an account, confirm its email out-of-band, and log in.
/// Returns the bearer token and the identity id.
#[allow(dead_code)]
pub async fn signed_in_user(
    app: &axum::Router,
    state: &AppState,
    email: &str,
    display_name: &str,
    role: &str,
) -> (String, Uuid) {
    let response = post_json(
        app,
        "/auth/register",
        serde_json::json!({
            "email": email,
            "password": "password123",
            "display_name": display_name,
            "role": role,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "registration failed");

    state.provider.confirm_email_for_tests(email);

    let response = post_json(
        app,
        "/auth/login",
        serde_json::json!({ "email": email, "password": "password123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login failed");

    let body = body_json(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    let user_id: Uuid = body["user"]["id"].as_str().unwrap().parse().unwrap();
    (token, user_id)
}

/// Pull a token or code out of an outbox message body by query-parameter name.
#[allow(dead_code)]
pub fn extract_param(body: &str, param: &str) -> String {
    let needle = format!("{}=", param);
    let start = body.find(&needle).expect("param not found in message") + needle.len();
    body[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect()
}
