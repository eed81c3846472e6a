use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, ok, paginated, read_upload};
use crate::handlers::AppState;
use crate::services::payments::{
    CreatePaymentRequest, PaymentListQuery, PaymentSummary, PaymentView, VerifyPaymentRequest,
};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Record the next payment tier for a validated booking (customer)
#[utoipa::path(
    post,
    path = "/api/pembayaran",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded as pending", body = ApiResponse<PaymentView>),
        (status = 400, description = "Tier not allowed, wrong amount or booking not validated", body = crate::errors::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentView>>), ServiceError> {
    let payment = state.services.payments.create(user.id, request).await?;
    Ok(created(payment))
}

#[utoipa::path(
    get,
    path = "/api/pembayaran",
    params(PaymentListQuery),
    responses((status = 200, description = "Payments", body = ApiResponse<PaginatedResponse<PaymentView>>)),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PaymentListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<PaymentView>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let scope = (!user.is_admin()).then_some(user.id);
    let result = state.services.payments.list(query, scope).await?;
    Ok(paginated(result, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/pembayaran/{id}",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<PaymentView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentView>>), ServiceError> {
    let payment = state.services.payments.get(&user, id).await?;
    Ok(ok(payment))
}

/// Attach transfer proof to a pending payment (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/pembayaran/{id}/bukti",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Proof stored", body = ApiResponse<PaymentView>),
        (status = 400, description = "Invalid file or payment already verified", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn upload_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PaymentView>>), ServiceError> {
    let form = read_upload(multipart).await?;
    let payment = state
        .services
        .payments
        .upload_proof(user.id, id, &form.filename, &form.bytes)
        .await?;
    Ok(ok(payment))
}

/// Settle a pending payment as lunas, cicilan or gagal (admin)
#[utoipa::path(
    put,
    path = "/api/pembayaran/{id}/verify",
    params(("id" = Uuid, Path, description = "Payment id")),
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = ApiResponse<PaymentView>),
        (status = 400, description = "Payment is not pending", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentView>>), ServiceError> {
    let admin_id = user.require_admin()?;
    let payment = state
        .services
        .payments
        .verify(admin_id, id, request)
        .await?;
    Ok(ok(payment))
}

/// Balance of a booking and the tiers it may still be paid with
#[utoipa::path(
    get,
    path = "/api/pembayaran/booking/{booking_id}/summary",
    params(("booking_id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Payment summary", body = ApiResponse<PaymentSummary>),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pembayaran"
)]
pub async fn payment_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentSummary>>), ServiceError> {
    let summary = state.services.payments.summary(&user, booking_id).await?;
    Ok(ok(summary))
}

pub fn routes() -> Router<AppState> {
    let authenticated = Router::new()
        .route("/", get(list_payments))
        .route("/:id", get(get_payment))
        .route("/booking/:booking_id/summary", get(payment_summary))
        .with_auth();

    let customer = Router::new()
        .route("/", post(create_payment))
        .route("/:id/bukti", post(upload_proof))
        .with_role(Role::Customer);

    let admin = Router::new()
        .route("/:id/verify", put(verify_payment))
        .with_role(Role::Admin);

    authenticated.merge(customer).merge(admin)
}
