// HTTP-level tests for the router
// Most only exercise paths that are rejected before any database access,
// so they run against a pool that never connects.

use super::*;
use axum::http::{header, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use crate::auth::token::{issue_test_token, test_claims};
use crate::db::create_test_pool;
use crate::test_support::{lazy_pool, test_state, unique_suffix, TEST_JWT_SECRET};

fn test_server() -> TestServer {
    TestServer::new(create_router(test_state(lazy_pool()))).unwrap()
}

fn error_code(body: &Value) -> &str {
    body["error_code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_public_redeem_rejects_malformed_code() {
    let server = test_server();

    let response = server
        .post("/api/public/coupons/redeem")
        .json(&json!({ "couponCode": "no spaces!" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "INVALID_CODE");
}

#[tokio::test]
async fn test_review_with_invalid_email_is_rejected() {
    let server = test_server();

    let response = server
        .post("/api/public/reviews")
        .json(&json!({
            "publicId": "demo",
            "slug": "demo",
            "stars": 5,
            "email": "guest-at-example"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "INVALID_EMAIL");
}

#[tokio::test]
async fn test_review_with_oversized_feedback_is_rejected() {
    let server = test_server();

    let response = server
        .post("/api/public/reviews")
        .json(&json!({
            "publicId": "demo",
            "slug": "demo",
            "stars": 2,
            "feedbackText": "x".repeat(2001)
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_review_with_unknown_liked_category_is_rejected() {
    let server = test_server();

    let response = server
        .post("/api/public/reviews")
        .json(&json!({
            "publicId": "demo",
            "slug": "demo",
            "stars": 5,
            "email": "guest@example.com",
            "likedCategories": ["Parking"]
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert_eq!(body["details"]["field"], "body");
    assert!(body["message"].as_str().unwrap_or_default().contains("Parking"));
}

#[tokio::test]
async fn test_unparseable_body_is_a_json_error() {
    let server = test_server();

    let response = server
        .post("/api/public/coupons/redeem")
        .content_type("application/json")
        .bytes("{\"couponCode\":".into())
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json::<Value>()), "VALIDATION_ERROR");
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn test_policy_with_unsupported_send_delay_is_rejected() {
    let server = TestServer::new(create_router(test_state(create_test_pool().await))).unwrap();
    let token = issue_test_token(
        TEST_JWT_SECRET,
        &test_claims(&format!("owner_{}", unique_suffix())),
    );

    let response = server
        .put(&format!(
            "/api/restaurants/{}/coupon-policies/positive",
            uuid::Uuid::new_v4()
        ))
        .add_header(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        )
        .json(&json!({
            "title": "Thanks",
            "reward": "10% off",
            "sendDelayMinutes": 3
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(error_code(&body), "VALIDATION_ERROR");
    assert_eq!(body["details"]["field"], "body");
}

#[tokio::test]
async fn test_owner_routes_require_a_token() {
    let server = test_server();

    for response in [
        server.get("/api/me").await,
        server.get("/api/restaurants").await,
        server.get("/api/coupons/verify").add_query_param("code", "ABCD2345").await,
        server
            .post("/api/coupons/redeem")
            .json(&json!({ "couponCode": "ABCD2345" }))
            .await,
    ] {
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&response.json::<Value>()), "UNAUTHENTICATED");
    }
}

#[tokio::test]
async fn test_owner_routes_reject_a_bad_token() {
    let server = test_server();

    let response = server
        .get("/api/restaurants")
        .add_header(
            header::AUTHORIZATION,
            "Bearer not.a.jwt".parse().unwrap(),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let server = test_server();

    let response = server.get("/api-docs/openapi.json").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let document = response.json::<Value>();
    assert!(document["paths"]["/api/public/reviews"].is_object());
    assert!(document["paths"]["/api/restaurants/{id}/insights/{time_range}"].is_object());
    assert!(document["components"]["securitySchemes"]["bearer"].is_object());
}
