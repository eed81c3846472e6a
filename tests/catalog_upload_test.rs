//! Catalog, media, typed upload folders and the operational endpoints.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{response_bytes, response_json, TestApp};
use serde_json::json;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-body";

#[tokio::test]
async fn services_are_public_by_slug_and_hidden_when_inactive() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let service_id = app.create_service(&admin, "Prewedding Outdoor Bali", "7500000").await;

    let (status, body) = app
        .call(Method::GET, "/api/layanan/prewedding-outdoor-bali", None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["id"], service_id.as_str());
    assert_eq!(body["data"]["category"], "prewedding");
    assert!(body["data"]["media"].as_array().unwrap().is_empty());

    let (status, body) = app
        .call(
            Method::POST,
            "/api/layanan",
            Some(json!({
                "name": "Prewedding Outdoor Bali",
                "category": "prewedding",
                "description": "duplicate",
                "price_from": "100000",
                "turnaround": "7 hari",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "conflict");

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/api/layanan/{service_id}"),
            Some(json!({ "is_active": false })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::GET, &format!("/api/layanan/{service_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call(Method::GET, &format!("/api/layanan/{service_id}"), None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call(Method::GET, "/api/layanan", None, None).await;
    assert_eq!(body["data"]["pagination"]["total_items"], 0);
    let (_, body) = app
        .call(Method::GET, "/api/layanan?include_inactive=true", None, Some(&admin))
        .await;
    assert_eq!(body["data"]["pagination"]["total_items"], 1);
}

#[tokio::test]
async fn catalog_writes_are_admin_only_and_validated() {
    let app = TestApp::new().await;
    let (_, customer) = app.register_customer("katalog@example.com").await;
    let admin = app.admin_token().await;
    let payload = json!({
        "name": "Drone Mapping",
        "category": "drone",
        "description": "Aerial footage",
        "price_from": "2000000",
        "turnaround": "5 hari",
    });

    let (status, _) = app
        .call(Method::POST, "/api/layanan", Some(payload.clone()), Some(&customer))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut negative = payload.clone();
    negative["price_from"] = json!("-5");
    let (status, body) = app
        .call(Method::POST, "/api/layanan", Some(negative), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn service_with_bookings_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, customer) = app.register_customer("hapus@example.com").await;
    let booked = app.create_service(&admin, "Graduation Studio", "600000").await;
    let unused = app.create_service(&admin, "Graduation Outdoor", "800000").await;
    app.create_booking(&customer, &booked).await;

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/layanan/{booked}"), None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_state");

    let (status, body) = app
        .call(Method::DELETE, &format!("/api/layanan/{unused}"), None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Service deleted");
}

#[tokio::test]
async fn media_upload_lands_in_the_images_folder() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let service_id = app.create_service(&admin, "Corporate Portrait", "1500000").await;

    let response = app
        .upload(
            "/api/layanan-media",
            "Sample Shot.PNG",
            PNG_BYTES,
            &[("service_id", service_id.as_str()), ("caption", "Lobby")],
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    assert_eq!(body["data"]["media_type"], "image");
    assert_eq!(body["data"]["position"], 0);
    let url = body["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/images/sample-shot-"));

    let served = app.request(Method::GET, &url, None, None).await;
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(response_bytes(served).await, PNG_BYTES);

    let response = app
        .upload(
            "/api/layanan-media",
            "notes.txt",
            b"plain text",
            &[("service_id", service_id.as_str())],
            Some(&admin),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, body) = app
        .call(Method::GET, &format!("/api/layanan/{service_id}/media"), None, None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_folders_follow_role_policy() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (_, customer) = app.register_customer("unggah@example.com").await;

    let response = app
        .upload("/api/upload/images", "banner.png", PNG_BYTES, &[], Some(&customer))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .upload("/api/upload/archive", "banner.png", PNG_BYTES, &[], Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .upload("/api/upload/payments", "bukti transfer.jpg", PNG_BYTES, &[], Some(&customer))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let stored = response_json(response).await;
    let filename = stored["data"]["filename"].as_str().unwrap().to_string();
    assert!(filename.starts_with("bukti-transfer-"));
    assert!(filename.ends_with(".jpg"));

    let download = app
        .request(Method::GET, &format!("/api/upload/payments/{filename}"), None, None)
        .await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(download.headers()[header::CONTENT_TYPE], "image/jpeg");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/upload/payments/{filename}"),
            None,
            Some(&customer),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("/api/upload/payments/{filename}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File deleted");

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/api/upload/payments/{filename}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payment_proof_is_attached_by_its_owner() {
    let app = TestApp::new().await;
    let (customer, _, booking) = app.validated_booking("bukti@example.com", "400000").await;
    let (_, payment) = app
        .call(
            Method::POST,
            "/api/pembayaran",
            Some(json!({
                "booking_id": booking["id"],
                "payment_type": "full",
                "amount": "400000",
                "method": "transfer",
            })),
            Some(&customer),
        )
        .await;
    let payment_id = payment["data"]["id"].as_str().unwrap();

    let response = app
        .upload(
            &format!("/api/pembayaran/{payment_id}/bukti"),
            "bukti.pdf",
            b"%PDF-1.4 proof",
            &[],
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["data"]["proof_url"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/payments/bukti-"));

    let (_, stranger) = app.register_customer("asing@example.com").await;
    let response = app
        .upload(
            &format!("/api/pembayaran/{payment_id}/bukti"),
            "bukti.pdf",
            b"%PDF-1.4 proof",
            &[],
            Some(&stranger),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let app = TestApp::new().await;

    let (status, body) = app.call(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["details"]["database"]["status"], "up");
    assert_eq!(body["environment"], "development");

    let (status, body) = app.call(Method::GET, "/api/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alive"], true);

    let (status, body) = app.call(Method::GET, "/api/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);

    let (status, body) = app.call(Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/pemesanan"].is_object());
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/layanan", None, None).await;
    assert!(response.headers().contains_key("x-request-id"));

    let (status, body) = app.call(Method::GET, "/api/pemesanan/not-a-uuid", None, None).await;
    assert_ne!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
}
