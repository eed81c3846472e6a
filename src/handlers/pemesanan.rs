use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, ok, paginated};
use crate::handlers::AppState;
use crate::services::bookings::{
    AdjustTotalRequest, BookingDetail, BookingListQuery, BookingView, CreateBookingRequest,
    TrackingView, UpdateBookingStatusRequest,
};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Book a catalog service (customer)
#[utoipa::path(
    post,
    path = "/api/pemesanan",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created, awaiting validation", body = ApiResponse<BookingView>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 404, description = "Service not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pemesanan"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingView>>), ServiceError> {
    let customer_id = user.require_customer()?;
    let booking = state.services.bookings.create(customer_id, request).await?;
    Ok(created(booking))
}

/// Customers see their own bookings; admins see all
#[utoipa::path(
    get,
    path = "/api/pemesanan",
    params(BookingListQuery),
    responses((status = 200, description = "Bookings", body = ApiResponse<PaginatedResponse<BookingView>>)),
    security(("bearer_auth" = [])),
    tag = "Pemesanan"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<BookingView>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let scope = (!user.is_admin()).then_some(user.id);
    let result = state.services.bookings.list(query, scope).await?;
    Ok(paginated(result, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/pemesanan/{id}",
    params(("id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking with service, meeting and payments", body = ApiResponse<BookingDetail>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pemesanan"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<BookingDetail>>), ServiceError> {
    let detail = state.services.bookings.get(&user, id).await?;
    Ok(ok(detail))
}

/// Public order tracking by tracking code or order code
#[utoipa::path(
    get,
    path = "/api/pemesanan/track/{code}",
    params(("code" = String, Path, description = "Tracking code (TRK-...) or order code (INV-...)")),
    responses(
        (status = 200, description = "Reduced booking projection", body = ApiResponse<TrackingView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Pemesanan"
)]
pub async fn track_booking(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<TrackingView>>), ServiceError> {
    let view = state.services.bookings.track(&code).await?;
    Ok(ok(view))
}

/// Validate or cancel a booking awaiting validation (admin)
#[utoipa::path(
    put,
    path = "/api/pemesanan/{id}/status",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<BookingView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pemesanan"
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingView>>), ServiceError> {
    let booking = state.services.bookings.update_status(id, request).await?;
    Ok(ok(booking))
}

/// Adjust the amount due (admin); never below what payments already hold
#[utoipa::path(
    put,
    path = "/api/pemesanan/{id}/total",
    params(("id" = Uuid, Path, description = "Booking id")),
    request_body = AdjustTotalRequest,
    responses(
        (status = 200, description = "Total adjusted", body = ApiResponse<BookingView>),
        (status = 400, description = "Total below held payments", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pemesanan"
)]
pub async fn adjust_total(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AdjustTotalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingView>>), ServiceError> {
    let booking = state.services.bookings.adjust_total(id, request).await?;
    Ok(ok(booking))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new().route("/track/:code", get(track_booking));

    let authenticated = Router::new()
        .route("/", post(create_booking).get(list_bookings))
        .route("/:id", get(get_booking))
        .with_auth();

    let admin = Router::new()
        .route("/:id/status", put(update_booking_status))
        .route("/:id/total", put(adjust_total))
        .with_role(Role::Admin);

    public.merge(authenticated).merge(admin)
}
