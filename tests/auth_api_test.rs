mod common;

use axum::http::StatusCode;
use common::{TestApp, TEST_PASSWORD};
use serde_json::json;
use storefront_api::entities::user::UserRole;

#[tokio::test]
async fn register_creates_customer_and_returns_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "alice@example.com",
                "password": "supersecret",
                "full_name": "Alice Example"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    assert!(!body["token"].as_str().unwrap_or_default().is_empty());
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "customer");
    assert!(
        body["user"].get("password_hash").is_none(),
        "password hash must never be serialized"
    );
}

#[tokio::test]
async fn register_accepts_retailer_role() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "shop@example.com",
                "password": "supersecret",
                "full_name": "Shop Owner",
                "role": "retailer"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "retailer");
}

#[tokio::test]
async fn admin_accounts_cannot_be_self_registered() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "boss@example.com",
                "password": "supersecret",
                "full_name": "Wannabe Admin",
                "role": "admin"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(!body["message"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let app = TestApp::new().await;
    app.create_user("taken@example.com", UserRole::Customer)
        .await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "taken@example.com",
                "password": "supersecret",
                "full_name": "Second Comer"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT, "body: {body}");
}

#[tokio::test]
async fn invalid_registration_payload_is_rejected_with_message() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/register",
            None,
            json!({
                "email": "not-an-email",
                "password": "short",
                "full_name": ""
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert!(
        !body["message"].as_str().unwrap_or_default().is_empty(),
        "validation errors must carry a human-readable message"
    );
}

#[tokio::test]
async fn login_returns_token_for_valid_credentials() {
    let app = TestApp::new().await;
    app.create_user("bob@example.com", UserRole::Customer).await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({
                "email": "bob@example.com",
                "password": TEST_PASSWORD
            }),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert!(!body["token"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new().await;
    app.create_user("carol@example.com", UserRole::Customer)
        .await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({
                "email": "carol@example.com",
                "password": "definitely-wrong"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // The same message as for an unknown email: no account enumeration.
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn login_with_unknown_email_matches_wrong_password_response() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/v1/auth/login",
            None,
            json!({
                "email": "ghost@example.com",
                "password": "whatever-it-takes"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn profile_requires_bearer_token() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/v1/user/profile", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .get("/api/v1/user/profile", Some("not-a-real-token"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_round_trip() {
    let app = TestApp::new().await;
    let (user, token) = app.create_user("dave@example.com", UserRole::Customer).await;

    let (status, body) = app.get("/api/v1/user/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], user.email);

    let (status, body) = app
        .put(
            "/api/v1/user/profile",
            Some(&token),
            json!({ "full_name": "Dave Renamed", "phone": "+15550001111" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Dave Renamed");
    assert_eq!(body["phone"], "+15550001111");
}

#[tokio::test]
async fn gif_profile_image_is_rejected_over_http() {
    let app = TestApp::new().await;
    let (_, token) = app.create_user("erin@example.com", UserRole::Customer).await;

    let (status, body) = app
        .post_multipart(
            "/api/v1/user/profile/image",
            Some(&token),
            &[("profileImage", Some("avatar.gif"), b"GIF89a not really")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(!message.is_empty());
    assert!(message.contains(".gif"), "message was: {message}");

    // The profile keeps no trace of the rejected upload.
    let (status, body) = app.get("/api/v1/user/profile", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["profile_image"].is_null());
}
