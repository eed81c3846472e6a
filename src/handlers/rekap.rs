use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, ok, paginated};
use crate::handlers::AppState;
use crate::services::reports::{GenerateRecapRequest, RecapListQuery, RecapRunView};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// Aggregate bookings, meetings and payments for a date range into an xlsx workbook
#[utoipa::path(
    post,
    path = "/api/rekap",
    request_body = GenerateRecapRequest,
    responses(
        (status = 201, description = "Recap generated", body = ApiResponse<RecapRunView>),
        (status = 400, description = "Invalid date range", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Rekap"
)]
pub async fn generate_recap(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<GenerateRecapRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RecapRunView>>), ServiceError> {
    let admin_id = user.require_admin()?;
    let run = state.services.reports.generate(admin_id, request).await?;
    Ok(created(run))
}

#[utoipa::path(
    get,
    path = "/api/rekap",
    params(RecapListQuery),
    responses((status = 200, description = "Previous recap runs", body = ApiResponse<PaginatedResponse<RecapRunView>>)),
    security(("bearer_auth" = [])),
    tag = "Rekap"
)]
pub async fn list_recaps(
    State(state): State<AppState>,
    Query(query): Query<RecapListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<RecapRunView>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let result = state.services.reports.list(query).await?;
    Ok(paginated(result, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/rekap/{id}",
    params(("id" = Uuid, Path, description = "Recap run id")),
    responses(
        (status = 200, description = "Recap run", body = ApiResponse<RecapRunView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Rekap"
)]
pub async fn get_recap(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<RecapRunView>>), ServiceError> {
    let run = state.services.reports.get(id).await?;
    Ok(ok(run))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(generate_recap).get(list_recaps))
        .route("/:id", get(get_recap))
        .with_role(Role::Admin)
}
