//! Registration, login precedence and role gating over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, ADMIN_EMAIL, ADMIN_PASSWORD, CUSTOMER_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_returns_customer_profile_and_tokens() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Dewi Lestari",
                "email": "Dewi@Example.com",
                "password": "kata-sandi-1",
                "phone": "081234567890",
            })),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["role"], "pengguna");
    assert_eq!(body["data"]["user"]["email"], "dewi@example.com");
    assert_eq!(body["data"]["tokens"]["token_type"], "Bearer");
    assert!(body["data"]["tokens"]["refresh_token"].is_string());
}

#[tokio::test]
async fn register_rejects_invalid_phone_and_duplicate_email() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Dewi",
                "email": "dewi@example.com",
                "password": "kata-sandi-1",
                "phone": "12345",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    app.register_customer("dewi@example.com").await;
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Dewi Again",
                "email": "DEWI@example.com",
                "password": "kata-sandi-1",
                "phone": "+6281234567891",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "conflict");

    // admin emails are taken too
    let (status, _) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Impostor",
                "email": ADMIN_EMAIL,
                "password": "kata-sandi-1",
                "phone": "+6281234567892",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_checks_admin_table_first() {
    let app = TestApp::new().await;
    app.register_customer("shared@studio.test").await;
    app.state
        .services
        .accounts
        .seed_admin("Second Admin", "shared@studio.test", "admin-secret-99")
        .await
        .expect("seed admin")
        .expect("admin created");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "shared@studio.test", "password": "admin-secret-99" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["user"]["role"], "admin");

    // the customer password no longer reaches the customer row
    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "shared@studio.test", "password": CUSTOMER_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new().await;

    let (wrong_status, wrong_body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
            None,
        )
        .await;
    let (unknown_status, unknown_body) = app
        .call(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "email": "nobody@studio.test", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn protected_routes_distinguish_missing_token_and_wrong_role() {
    let app = TestApp::new().await;
    let (_, customer) = app.register_customer("role@example.com").await;

    let (status, body) = app.call(Method::GET, "/api/pemesanan", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .call(Method::GET, "/api/pengguna", None, Some(&customer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(Method::GET, "/api/pemesanan", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.admin_token().await;
    let (status, body) = app.call(Method::GET, "/api/pengguna", None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn me_refresh_and_change_password() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "name": "Rina",
                "email": "rina@example.com",
                "password": CUSTOMER_PASSWORD,
                "phone": "6281298765432",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let access = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["data"]["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/api/auth/me", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "rina@example.com");
    assert_eq!(body["data"]["phone"], "6281298765432");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/auth/refresh",
            Some(json!({ "refresh_token": refresh })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["tokens"]["access_token"].is_string());

    let (status, _) = app
        .call(
            Method::PUT,
            "/api/auth/password",
            Some(json!({ "current_password": "wrong-one-1", "new_password": "baru-sekali-9" })),
            Some(&access),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(
            Method::PUT,
            "/api/auth/password",
            Some(json!({ "current_password": CUSTOMER_PASSWORD, "new_password": "baru-sekali-9" })),
            Some(&access),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    app.login("rina@example.com", "baru-sekali-9").await;
}

#[tokio::test]
async fn logout_revokes_the_access_token() {
    let app = TestApp::new().await;
    let (_, token) = app.register_customer("keluar@example.com").await;

    let (status, body) = app.call(Method::POST, "/api/auth/logout", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");

    let (status, body) = app.call(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "auth_invalid_token");
}
