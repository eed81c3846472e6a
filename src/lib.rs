//! Studio Booking API Library
//!
//! Bookings, consultation meetings, tiered payments and generated documents
//! for a photography and web-services studio.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod rate_limiter;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit, http::HeaderValue, routing::get, Extension, Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    services::ServeDir,
};
use utoipa::ToSchema;

use crate::auth::{AuthConfig, AuthService};
use crate::errors::ServiceError;
use crate::storage::FileStore;

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub rate_limiter: rate_limiter::RateLimiter,
    pub started_at: Instant,
}

impl AppState {
    /// Wires services over an open, migrated connection: prepares the upload
    /// folders and seeds the configured admin account.
    pub async fn bootstrap(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
    ) -> Result<Self, ServiceError> {
        let files = Arc::new(FileStore::new(&config.upload_dir, config.max_upload_bytes));
        files.init().await?;

        let auth = Arc::new(AuthService::new(AuthConfig::from_app_config(&config)));
        let services = handlers::AppServices::new(db.clone(), &config, auth, files)?;

        if let (Some(email), Some(password)) =
            (&config.admin_seed_email, &config.admin_seed_password)
        {
            if let Some(admin) = services
                .accounts
                .seed_admin(&config.admin_seed_name, email, password)
                .await?
            {
                ::tracing::info!(admin_id = %admin.id, "Seeded admin account");
            }
        }

        let rate_limiter =
            rate_limiter::RateLimiter::new(rate_limiter::RateLimitConfig::from(&config));

        Ok(Self {
            db,
            config,
            services,
            rate_limiter,
            started_at: Instant::now(),
        })
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total_items: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        Self {
            items,
            pagination: Pagination {
                current_page: page,
                total_pages: total_items.div_ceil(limit),
                total_items,
                items_per_page: limit,
            },
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Every resource router under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", handlers::auth::routes())
        .nest("/pengguna", handlers::pengguna::routes())
        .nest("/layanan", handlers::layanan::routes())
        .nest("/layanan-media", handlers::layanan_media::routes())
        .nest("/pemesanan", handlers::pemesanan::routes())
        .nest("/meeting", handlers::meeting::routes())
        .nest("/pembayaran", handlers::pembayaran::routes())
        .nest("/rekap", handlers::rekap::routes())
        .nest("/upload", handlers::upload::routes())
        .nest("/documents", handlers::documents::routes())
        .nest("/health", health::health_routes())
}

fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        ::tracing::warn!("No CORS origins configured; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Full HTTP application: API, upload serving, OpenAPI document and the
/// cross-cutting layers (request id, auth service injection, CORS, tracing,
/// rate limiting).
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let uploads = ServeDir::new(state.services.files.root());
    let rate_limit = rate_limiter::RateLimitLayer::from_limiter(state.rate_limiter.clone());

    Router::new()
        .route("/", get(|| async { "studio-booking-api up" }))
        .nest("/api", api_routes())
        .merge(openapi::openapi_routes())
        .nest_service(storage::PUBLIC_PREFIX, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(rate_limit)
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(Extension(state.services.auth.clone()))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[tokio::test]
    async fn message_response_has_no_data() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-msg"), async {
                ApiResponse::<()>::message("Logged out".into())
            })
            .await;

        assert!(response.success);
        assert!(response.data.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["message"], "Logged out");
        assert!(json.get("data").is_none());
        assert_eq!(json["meta"]["request_id"], "meta-msg");
    }

    #[test]
    fn pagination_rounds_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 21, 2, 10);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.pagination.current_page, 2);
        assert_eq!(page.pagination.items_per_page, 10);

        let empty = PaginatedResponse::<u8>::new(vec![], 0, 1, 20);
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
