//! Receipts, invoices, agreements and spreadsheet recaps.

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use common::{response_bytes, TestApp};
use serde_json::{json, Value};

async fn pay_full(app: &TestApp, customer: &str, booking: &Value) -> String {
    let (status, body) = app
        .call(
            Method::POST,
            "/api/pembayaran",
            Some(json!({
                "booking_id": booking["id"],
                "payment_type": "full",
                "amount": booking["total_tagihan"],
                "method": "transfer Mandiri",
            })),
            Some(customer),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn fetch(app: &TestApp, url: &str) -> (StatusCode, Vec<u8>) {
    let response = app.request(Method::GET, url, None, None).await;
    let status = response.status();
    (status, response_bytes(response).await)
}

#[tokio::test]
async fn receipt_is_only_issued_for_lunas_payments() {
    let app = TestApp::new().await;
    let (customer, admin, booking) = app.validated_booking("kwitansi@example.com", "1200000").await;
    let payment_id = pay_full(&app, &customer, &booking).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/documents/kwitansi/{payment_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");

    app.call(
        Method::PUT,
        &format!("/api/pembayaran/{payment_id}/verify"),
        Some(json!({ "status": "lunas" })),
        Some(&admin),
    )
    .await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/documents/kwitansi/{payment_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["kind"], "kwitansi");
    let url = body["data"]["file"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/receipts/"));

    let (status, bytes) = fetch(&app, &url).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));

    let (_, body) = app
        .call(Method::GET, &format!("/api/pembayaran/{payment_id}"), None, Some(&customer))
        .await;
    assert_eq!(body["data"]["receipt_url"], url.as_str());
}

#[tokio::test]
async fn regenerating_an_invoice_replaces_the_previous_file() {
    let app = TestApp::new().await;
    let (_, admin, booking) = app.validated_booking("invoice@example.com", "2500000").await;
    let booking_id = booking["id"].as_str().unwrap();
    let uri = format!("/api/documents/invoice/{booking_id}");

    let (status, first) = app.call(Method::POST, &uri, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let first_url = first["data"]["file"]["url"].as_str().unwrap().to_string();
    assert!(first_url.starts_with("/uploads/invoices/"));
    assert_eq!(fetch(&app, &first_url).await.0, StatusCode::OK);

    let (status, second) = app.call(Method::POST, &uri, None, Some(&admin)).await;
    assert_eq!(status, StatusCode::CREATED);
    let second_url = second["data"]["file"]["url"].as_str().unwrap().to_string();
    assert_ne!(first_url, second_url);

    let (status, bytes) = fetch(&app, &second_url).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(fetch(&app, &first_url).await.0, StatusCode::NOT_FOUND);

    let (_, body) = app
        .call(Method::GET, &format!("/api/pemesanan/{booking_id}"), None, Some(&admin))
        .await;
    assert_eq!(body["data"]["booking"]["invoice_url"], second_url.as_str());
}

#[tokio::test]
async fn mou_is_generated_from_a_meeting() {
    let app = TestApp::new().await;
    let (customer, admin, booking) = app.validated_booking("mou@example.com", "5000000").await;
    let (status, meeting) = app
        .call(
            Method::POST,
            "/api/meeting",
            Some(json!({ "booking_id": booking["id"], "platform": "Zoom" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let meeting_id = meeting["data"]["id"].as_str().unwrap();

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/documents/mou/{meeting_id}"),
            None,
            Some(&customer),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/documents/mou/{meeting_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let url = body["data"]["file"]["url"].as_str().unwrap();
    assert!(url.starts_with("/uploads/mou/"));

    let (_, body) = app
        .call(Method::GET, &format!("/api/meeting/{meeting_id}"), None, Some(&admin))
        .await;
    assert_eq!(body["data"]["mou_url"], url);
}

#[tokio::test]
async fn preview_renders_html_without_writing_files() {
    let app = TestApp::new().await;
    let (_, admin, booking) = app.validated_booking("preview@example.com", "900000").await;
    let booking_id = booking["id"].as_str().unwrap();
    let order_code = booking["order_code"].as_str().unwrap();

    let response = app
        .request(
            Method::GET,
            &format!("/api/documents/preview/invoice/{booking_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(response_bytes(response).await).unwrap();
    assert!(html.contains(order_code));

    let (_, body) = app
        .call(Method::GET, &format!("/api/pemesanan/{booking_id}"), None, Some(&admin))
        .await;
    assert!(body["data"]["booking"]["invoice_file"].is_null());

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/documents/preview/brochure/{booking_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn recap_counts_the_period_and_writes_a_workbook() {
    let app = TestApp::new().await;
    let (customer, admin, booking) = app.validated_booking("rekap@example.com", "1000000").await;
    let payment_id = pay_full(&app, &customer, &booking).await;
    app.call(
        Method::PUT,
        &format!("/api/pembayaran/{payment_id}/verify"),
        Some(json!({ "status": "lunas" })),
        Some(&admin),
    )
    .await;

    let today = Utc::now().date_naive().to_string();
    let (status, body) = app
        .call(
            Method::POST,
            "/api/rekap",
            Some(json!({ "period_start": today, "period_end": today })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let run = &body["data"];
    assert_eq!(run["total_bookings"], 1);
    assert_eq!(run["bookings_validated"], 1);
    assert_eq!(run["total_payments"], 1);
    assert_eq!(run["payments_verified"], 1);
    assert_eq!(run["sum_full"], run["sum_lunas"]);

    let (status, bytes) = fetch(&app, run["report_url"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"PK"));

    let (status, body) = app.call(Method::GET, "/api/rekap", None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total_items"], 1);

    let (status, _) = app.call(Method::GET, "/api/rekap", None, Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn recap_rejects_an_inverted_period() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/rekap",
            Some(json!({ "period_start": "2026-02-10", "period_end": "2026-02-01" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}
