use crate::auth::{AuthRouterExt, Role};
use crate::documents::DocumentKind;
use crate::errors::ServiceError;
use crate::handlers::common::created;
use crate::handlers::AppState;
use crate::services::documents::GeneratedDocument;
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use std::str::FromStr;
use uuid::Uuid;

/// Generate the receipt of a settled payment
#[utoipa::path(
    post,
    path = "/api/documents/kwitansi/{payment_id}",
    params(("payment_id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 201, description = "Receipt PDF written", body = ApiResponse<GeneratedDocument>),
        (status = 400, description = "Payment is not lunas", body = crate::errors::ErrorResponse),
        (status = 404, description = "Payment not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn generate_kwitansi(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<GeneratedDocument>>), ServiceError> {
    let document = state.services.documents.kwitansi(payment_id).await?;
    Ok(created(document))
}

#[utoipa::path(
    post,
    path = "/api/documents/invoice/{booking_id}",
    params(("booking_id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 201, description = "Invoice PDF written", body = ApiResponse<GeneratedDocument>),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn generate_invoice(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<GeneratedDocument>>), ServiceError> {
    let document = state.services.documents.invoice(booking_id).await?;
    Ok(created(document))
}

#[utoipa::path(
    post,
    path = "/api/documents/mou/{meeting_id}",
    params(("meeting_id" = Uuid, Path, description = "Meeting id")),
    responses(
        (status = 201, description = "MoU PDF written", body = ApiResponse<GeneratedDocument>),
        (status = 404, description = "Meeting not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn generate_mou(
    State(state): State<AppState>,
    Path(meeting_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<GeneratedDocument>>), ServiceError> {
    let document = state.services.documents.mou(meeting_id).await?;
    Ok(created(document))
}

/// Render a document as HTML without writing a file
#[utoipa::path(
    get,
    path = "/api/documents/preview/{kind}/{id}",
    params(
        ("kind" = DocumentKind, Path, description = "kwitansi, invoice or mou"),
        ("id" = Uuid, Path, description = "Payment, booking or meeting id"),
    ),
    responses(
        (status = 200, description = "Rendered HTML", content_type = "text/html"),
        (status = 400, description = "Unknown document kind", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn preview_document(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Html<String>, ServiceError> {
    let kind = DocumentKind::from_str(&kind)
        .map_err(|_| ServiceError::BadRequest(format!("Unknown document kind: {}", kind)))?;
    let html = state.services.documents.preview(kind, id).await?;
    Ok(Html(html))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/kwitansi/:payment_id", post(generate_kwitansi))
        .route("/invoice/:booking_id", post(generate_invoice))
        .route("/mou/:meeting_id", post(generate_mou))
        .route("/preview/:kind/:id", get(preview_document))
        .with_role(Role::Admin)
}
