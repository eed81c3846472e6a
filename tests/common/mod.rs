#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use studio_booking_api::{config::AppConfig, db, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@studio.test";
pub const ADMIN_PASSWORD: &str = "admin-password-123";
pub const CUSTOMER_PASSWORD: &str = "rahasia-123";

const JWT_SECRET: &str = "k3Jq9vX2mP7rT4wY8zB1nC6dF0gH5jL3sQ9uV2xA7eR4tY8iO1pW6mN3bZ5cK0lM";
const BOUNDARY: &str = "studio-test-boundary";

/// Application over a throwaway SQLite file and upload root.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller tweak the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let db_path = dir.path().join("studio_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = dir.path().join("uploads").display().to_string();
        cfg.admin_seed_email = Some(ADMIN_EMAIL.to_string());
        cfg.admin_seed_password = Some(ADMIN_PASSWORD.to_string());
        cfg.rate_limit_requests_per_window = 10_000;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::bootstrap(Arc::new(pool), cfg)
            .await
            .expect("failed to bootstrap state");
        let router = studio_booking_api::build_router(state.clone());

        Self {
            router,
            state,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond")
    }

    /// JSON request with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(request).await
    }

    /// Multipart request carrying `file` plus plain text fields.
    pub async fn upload(
        &self,
        uri: &str,
        filename: &str,
        bytes: &[u8],
        fields: &[(&str, &str)],
        token: Option<&str>,
    ) -> Response {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body)).expect("request"))
            .await
    }

    /// Sends a JSON request and returns status plus parsed body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["tokens"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Registers a customer and returns `(customer_id, access_token)`.
    pub async fn register_customer(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                Some(json!({
                    "name": "Sari Wulandari",
                    "email": email,
                    "password": CUSTOMER_PASSWORD,
                    "phone": "+6281234567890",
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        (
            body["data"]["user"]["id"].as_str().expect("id").to_string(),
            body["data"]["tokens"]["access_token"]
                .as_str()
                .expect("access token")
                .to_string(),
        )
    }

    /// Creates an active catalog service priced at `price` and returns its id.
    pub async fn create_service(&self, admin_token: &str, name: &str, price: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/layanan",
                Some(json!({
                    "name": name,
                    "category": "prewedding",
                    "description": "Outdoor session with two photographers",
                    "price_from": price,
                    "turnaround": "14 hari kerja",
                })),
                Some(admin_token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create service failed: {body}");
        body["data"]["id"].as_str().expect("service id").to_string()
    }

    /// Books `service_id` two weeks ahead and returns the booking payload.
    pub async fn create_booking(&self, customer_token: &str, service_id: &str) -> Value {
        let event_date = (Utc::now() + Duration::days(14)).date_naive();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/pemesanan",
                Some(json!({
                    "service_id": service_id,
                    "event_name": "Prewedding Sari & Bima",
                    "event_date": event_date.to_string(),
                    "event_time": "09:00",
                    "event_location": "Kebun Raya Bogor",
                })),
                Some(customer_token),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create booking failed: {body}");
        body["data"].clone()
    }

    pub async fn validate_booking(&self, admin_token: &str, booking_id: &str) {
        let (status, body) = self
            .call(
                Method::PUT,
                &format!("/api/pemesanan/{booking_id}/status"),
                Some(json!({ "status": "validated" })),
                Some(admin_token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "validate failed: {body}");
    }

    /// Customer, service and a validated booking in one go: `(customer_token, admin_token, booking)`.
    pub async fn validated_booking(&self, email: &str, price: &str) -> (String, String, Value) {
        let admin = self.admin_token().await;
        let (_, customer) = self.register_customer(email).await;
        let service_id = self
            .create_service(&admin, &format!("Prewedding {email}"), price)
            .await;
        let booking = self.create_booking(&customer, &service_id).await;
        let booking_id = booking["id"].as_str().expect("booking id");
        self.validate_booking(&admin, booking_id).await;
        (customer, admin, booking)
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = response_bytes(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}
