use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, ok, paginated};
use crate::handlers::AppState;
use crate::services::meetings::{
    CreateMeetingRequest, MeetingListQuery, MeetingView, SchedulingWebhook,
    UpdateMeetingRequest, UpdateMeetingStatusRequest, WebhookOutcome, SIGNATURE_HEADER,
};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

/// Schedule the consultation meeting for a validated booking (admin)
#[utoipa::path(
    post,
    path = "/api/meeting",
    request_body = CreateMeetingRequest,
    responses(
        (status = 201, description = "Meeting created with a tokenised scheduling link", body = ApiResponse<MeetingView>),
        (status = 400, description = "Booking not validated or meeting already exists", body = crate::errors::ErrorResponse),
        (status = 404, description = "Booking not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn create_meeting(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MeetingView>>), ServiceError> {
    let admin_id = user.require_admin()?;
    let meeting = state.services.meetings.create(admin_id, request).await?;
    Ok(created(meeting))
}

#[utoipa::path(
    get,
    path = "/api/meeting",
    params(MeetingListQuery),
    responses((status = 200, description = "Meetings", body = ApiResponse<PaginatedResponse<MeetingView>>)),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn list_meetings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<MeetingListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<MeetingView>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let scope = (!user.is_admin()).then_some(user.id);
    let result = state.services.meetings.list(query, scope).await?;
    Ok(paginated(result, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/meeting/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    responses(
        (status = 200, description = "Meeting", body = ApiResponse<MeetingView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn get_meeting(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<MeetingView>>), ServiceError> {
    let meeting = state.services.meetings.get(&user, id).await?;
    Ok(ok(meeting))
}

#[utoipa::path(
    get,
    path = "/api/meeting/booking/{booking_id}",
    params(("booking_id" = Uuid, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Meeting of the booking", body = ApiResponse<MeetingView>),
        (status = 404, description = "No meeting", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn get_meeting_by_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<MeetingView>>), ServiceError> {
    let meeting = state
        .services
        .meetings
        .get_by_booking(&user, booking_id)
        .await?;
    Ok(ok(meeting))
}

#[utoipa::path(
    put,
    path = "/api/meeting/{id}",
    params(("id" = Uuid, Path, description = "Meeting id")),
    request_body = UpdateMeetingRequest,
    responses(
        (status = 200, description = "Meeting updated", body = ApiResponse<MeetingView>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn update_meeting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMeetingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MeetingView>>), ServiceError> {
    let meeting = state.services.meetings.update(id, request).await?;
    Ok(ok(meeting))
}

#[utoipa::path(
    put,
    path = "/api/meeting/{id}/status",
    params(("id" = Uuid, Path, description = "Meeting id")),
    request_body = UpdateMeetingStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<MeetingView>),
        (status = 400, description = "Transition not allowed", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Meeting"
)]
pub async fn update_meeting_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMeetingStatusRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MeetingView>>), ServiceError> {
    let meeting = state.services.meetings.update_status(id, request).await?;
    Ok(ok(meeting))
}

/// Scheduling provider callback. Signature-verified when a signing key is configured.
#[utoipa::path(
    post,
    path = "/api/meeting/calendly-webhook",
    request_body = SchedulingWebhook,
    responses(
        (status = 200, description = "Notification acknowledged", body = ApiResponse<WebhookOutcome>),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
    ),
    tag = "Meeting"
)]
pub async fn scheduling_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<WebhookOutcome>>), ServiceError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let outcome = state
        .services
        .meetings
        .handle_webhook(signature, &body)
        .await?;
    Ok(ok(outcome))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new().route("/calendly-webhook", post(scheduling_webhook));

    let authenticated = Router::new()
        .route("/", get(list_meetings))
        .route("/:id", get(get_meeting))
        .route("/booking/:booking_id", get(get_meeting_by_booking))
        .with_auth();

    let admin = Router::new()
        .route("/", post(create_meeting))
        .route("/:id", put(update_meeting))
        .route("/:id/status", put(update_meeting_status))
        .with_role(Role::Admin);

    public.merge(authenticated).merge(admin)
}
