use axum::{routing::get, Json, Router};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Studio Booking API",
        version = "0.1.0",
        description = r#"
# Studio Booking API

Bookings, consultation meetings, tiered payments and generated documents for a
photography and web-services studio.

## Authentication

Register or log in under `/api/auth`, then send the access token:

```
Authorization: Bearer <access-token>
```

Admin and customer tokens are distinguished by their `role` claim.

## Payments

A validated booking is paid either with `dp` (25%) followed by `pelunasan` (75%),
or at once with `full` (100%). `GET /api/pembayaran/booking/{booking_id}/summary`
lists the tiers still allowed.

## Errors

```json
{
  "success": false,
  "error": "Bad Request",
  "code": "validation_error",
  "message": "amount must be positive",
  "timestamp": "2026-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (default 20, max 100).
        "#
    ),
    servers((url = "http://localhost:8080", description = "Local development")),
    modifiers(&BearerAuth),
    tags(
        (name = "Auth", description = "Registration, login and tokens"),
        (name = "Pengguna", description = "Customer profiles"),
        (name = "Layanan", description = "Service catalog"),
        (name = "Layanan Media", description = "Catalog images and videos"),
        (name = "Pemesanan", description = "Bookings and public tracking"),
        (name = "Meeting", description = "Consultation meetings and scheduling webhook"),
        (name = "Pembayaran", description = "Tiered payments"),
        (name = "Documents", description = "Kwitansi, invoice and MoU PDFs"),
        (name = "Rekap", description = "Spreadsheet recaps"),
        (name = "Upload", description = "Typed upload folders"),
        (name = "Health", description = "Health checks")
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::auth::logout,
        handlers::auth::change_password,

        handlers::pengguna::list_customers,
        handlers::pengguna::get_customer,
        handlers::pengguna::delete_customer,
        handlers::pengguna::get_profile,
        handlers::pengguna::update_profile,
        handlers::pengguna::upload_photo,

        handlers::layanan::list_services,
        handlers::layanan::get_service,
        handlers::layanan::list_service_media,
        handlers::layanan::create_service,
        handlers::layanan::update_service,
        handlers::layanan::delete_service,

        handlers::layanan_media::add_media,
        handlers::layanan_media::get_media,
        handlers::layanan_media::list_for_service,
        handlers::layanan_media::update_media,
        handlers::layanan_media::delete_media,

        handlers::pemesanan::create_booking,
        handlers::pemesanan::list_bookings,
        handlers::pemesanan::get_booking,
        handlers::pemesanan::track_booking,
        handlers::pemesanan::update_booking_status,
        handlers::pemesanan::adjust_total,

        handlers::meeting::create_meeting,
        handlers::meeting::list_meetings,
        handlers::meeting::get_meeting,
        handlers::meeting::get_meeting_by_booking,
        handlers::meeting::update_meeting,
        handlers::meeting::update_meeting_status,
        handlers::meeting::scheduling_webhook,

        handlers::pembayaran::create_payment,
        handlers::pembayaran::list_payments,
        handlers::pembayaran::get_payment,
        handlers::pembayaran::upload_proof,
        handlers::pembayaran::verify_payment,
        handlers::pembayaran::payment_summary,

        handlers::documents::generate_kwitansi,
        handlers::documents::generate_invoice,
        handlers::documents::generate_mou,
        handlers::documents::preview_document,

        handlers::rekap::generate_recap,
        handlers::rekap::list_recaps,
        handlers::rekap::get_recap,

        handlers::upload::upload_file,
        handlers::upload::download_file,
        handlers::upload::delete_file,

        crate::health::health_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::ResponseMeta,
            crate::Pagination,
            crate::auth::Role,
            crate::auth::TokenPair,
            crate::storage::StoredFile,
            crate::storage::UploadFolder,
            crate::documents::DocumentKind,
            crate::entities::booking::BookingStatus,
            crate::entities::meeting::MeetingStatus,
            crate::entities::payment::PaymentType,
            crate::entities::payment::PaymentStatus,
            crate::entities::service::ServiceCategory,
            crate::entities::service_media::MediaType,
        )
    )
)]
pub struct ApiDoc;

/// Serves the generated document at `/api-docs/openapi.json`
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_resources_and_bearer_scheme() {
        let json = serde_json::to_string(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Studio Booking API"));
        assert!(json.contains("/api/pemesanan/track/{code}"));
        assert!(json.contains("/api/pembayaran/booking/{booking_id}/summary"));
        assert!(json.contains("bearer_auth"));
    }
}
