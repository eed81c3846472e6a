//! Consultation meetings and the scheduling webhook.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use common::{response_json, TestApp};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use studio_booking_api::services::meetings::SIGNATURE_HEADER;

const WEBHOOK_SECRET: &str = "whsec-studio-test";

async fn schedule(app: &TestApp, admin: &str, booking_id: &str) -> (StatusCode, Value) {
    app.call(
        Method::POST,
        "/api/meeting",
        Some(json!({ "booking_id": booking_id, "platform": "Zoom" })),
        Some(admin),
    )
    .await
}

fn invitee_created(token: &str) -> Value {
    json!({
        "event": "invitee.created",
        "payload": {
            "name": "Sari W.",
            "email": "sari.calendar@example.com",
            "text_reminder_number": "+6281311112222",
            "questions_and_answers": [
                { "question": "Catatan", "answer": "Konsep rustic, outdoor" }
            ],
            "scheduled_event": {
                "start_time": "2030-05-01T03:00:00Z",
                "end_time": "2030-05-01T04:00:00Z"
            },
            "tracking": { "utm_content": token }
        }
    })
}

async fn post_webhook(app: &TestApp, body: &Value, signature: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/meeting/calendly-webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    let response = app
        .send(builder.body(Body::from(body.to_string())).unwrap())
        .await;
    let status = response.status();
    (status, response_json(response).await)
}

fn sign(body: &Value, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[tokio::test]
async fn meeting_carries_a_correlated_scheduling_link() {
    let app = TestApp::new().await;
    let (customer, admin, booking) = app.validated_booking("meet@example.com", "1000000").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, body) = schedule(&app, &admin, booking_id).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let meeting = &body["data"];
    let token = meeting["correlation_token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(meeting["scheduling_link"]
        .as_str()
        .unwrap()
        .ends_with(&format!("utm_content={token}")));
    assert_eq!(meeting["status"], "scheduled");
    assert_eq!(meeting["client_email"], "meet@example.com");

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/meeting/booking/{booking_id}"),
            None,
            Some(&customer),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], meeting["id"]);

    let (status, body) = app.call(Method::GET, "/api/meeting", None, Some(&customer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn concurrent_scheduling_creates_exactly_one_meeting() {
    let app = TestApp::new().await;
    let (_, admin, booking) = app.validated_booking("race@example.com", "1000000").await;
    let booking_id = booking["id"].as_str().unwrap();

    let (first, second) = tokio::join!(
        schedule(&app, &admin, booking_id),
        schedule(&app, &admin, booking_id)
    );

    let statuses = [first.0, second.0];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1,
        "{first:?} / {second:?}"
    );
    let rejected = if first.0 == StatusCode::CREATED { &second } else { &first };
    assert_eq!(rejected.0, StatusCode::BAD_REQUEST);
    assert!(rejected.1["message"]
        .as_str()
        .unwrap()
        .contains("already exists"));

    let (_, body) = app.call(Method::GET, "/api/meeting", None, Some(&admin)).await;
    assert_eq!(body["data"]["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn meetings_need_a_validated_booking_and_an_admin() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, customer) = app.register_customer("pending@example.com").await;
    let service_id = app.create_service(&admin, "Web Company Profile", "4000000").await;
    let booking = app.create_booking(&customer, &service_id).await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, body) = schedule(&app, &admin, booking_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");

    app.validate_booking(&admin, booking_id).await;
    let (status, _) = schedule(&app, &customer, booking_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn meeting_status_only_leaves_scheduled_once() {
    let app = TestApp::new().await;
    let (_, admin, booking) = app.validated_booking("done@example.com", "1000000").await;
    let (_, body) = schedule(&app, &admin, booking["id"].as_str().unwrap()).await;
    let meeting_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/meeting/{meeting_id}"),
            Some(json!({
                "platform": "Google Meet",
                "start_time": "2030-01-01T10:00:00Z",
                "end_time": "2030-01-01T09:00:00Z",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/meeting/{meeting_id}/status"),
            Some(json!({ "status": "completed" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/meeting/{meeting_id}/status"),
            Some(json!({ "status": "cancelled" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_updates_the_matching_meeting() {
    let app = TestApp::new().await;
    let (_, admin, booking) = app.validated_booking("hook@example.com", "1000000").await;
    let (_, body) = schedule(&app, &admin, booking["id"].as_str().unwrap()).await;
    let meeting_id = body["data"]["id"].as_str().unwrap().to_string();
    let token = body["data"]["correlation_token"].as_str().unwrap().to_string();

    let (status, body) = post_webhook(&app, &invitee_created(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["matched"], true);
    assert_eq!(body["data"]["meeting_id"], meeting_id.as_str());

    let (_, body) = app
        .call(Method::GET, &format!("/api/meeting/{meeting_id}"), None, Some(&admin))
        .await;
    let meeting = &body["data"];
    assert_eq!(meeting["client_name"], "Sari W.");
    assert_eq!(meeting["client_email"], "sari.calendar@example.com");
    assert_eq!(meeting["client_phone"], "+6281311112222");
    assert_eq!(meeting["start_time"], "2030-05-01T03:00:00Z");

    let cancel = json!({ "event": "invitee.canceled", "payload": { "tracking": { "utm_content": token } } });
    let (status, _) = post_webhook(&app, &cancel, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app
        .call(Method::GET, &format!("/api/meeting/{meeting_id}"), None, Some(&admin))
        .await;
    assert_eq!(body["data"]["status"], "cancelled");
}

#[tokio::test]
async fn webhook_without_a_known_token_is_acknowledged() {
    let app = TestApp::new().await;

    let (status, body) = post_webhook(&app, &invitee_created("0123456789abcdef"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["matched"], false);

    let (status, body) = post_webhook(&app, &json!({ "event": "invitee.created" }), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["matched"], false);
}

#[tokio::test]
async fn webhook_signature_is_enforced_when_a_secret_is_set() {
    let app = TestApp::with_config(|cfg| {
        cfg.scheduling_webhook_secret = Some(WEBHOOK_SECRET.to_string());
    })
    .await;
    let payload = invitee_created("ffffffffffffffffffffffffffffffff");

    let (status, _) = post_webhook(&app, &payload, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stale = sign(&payload, Utc::now().timestamp() - 3_600);
    let (status, _) = post_webhook(&app, &payload, Some(stale)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = format!("t={},v1={}", Utc::now().timestamp(), "ab".repeat(32));
    let (status, _) = post_webhook(&app, &payload, Some(forged)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let valid = sign(&payload, Utc::now().timestamp());
    let (status, body) = post_webhook(&app, &payload, Some(valid)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}
