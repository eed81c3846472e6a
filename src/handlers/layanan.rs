use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, message, ok, paginated};
use crate::handlers::AppState;
use crate::services::catalog::{
    CreateServiceRequest, MediaView, ServiceListQuery, ServiceView, UpdateServiceRequest,
};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

fn caller_is_admin(user: &Option<AuthUser>) -> bool {
    user.as_ref().map(AuthUser::is_admin).unwrap_or(false)
}

/// List catalog services. Inactive ones are only listed for admins asking `include_inactive`.
#[utoipa::path(
    get,
    path = "/api/layanan",
    params(ServiceListQuery),
    responses((status = 200, description = "Services", body = ApiResponse<PaginatedResponse<ServiceView>>)),
    tag = "Layanan"
)]
pub async fn list_services(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<ServiceListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<ServiceView>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let result = state
        .services
        .catalog
        .list(query, caller_is_admin(&user))
        .await?;
    Ok(paginated(result, page, limit))
}

/// Fetch a service with its media by id or slug
#[utoipa::path(
    get,
    path = "/api/layanan/{id_or_slug}",
    params(("id_or_slug" = String, Path, description = "Service id or slug")),
    responses(
        (status = 200, description = "Service", body = ApiResponse<ServiceView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Layanan"
)]
pub async fn get_service(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id_or_slug): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceView>>), ServiceError> {
    let service = state
        .services
        .catalog
        .get(&id_or_slug, caller_is_admin(&user))
        .await?;
    Ok(ok(service))
}

#[utoipa::path(
    get,
    path = "/api/layanan/{id}/media",
    params(("id" = Uuid, Path, description = "Service id")),
    responses((status = 200, description = "Media ordered by position", body = ApiResponse<Vec<MediaView>>)),
    tag = "Layanan"
)]
pub async fn list_service_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<MediaView>>>), ServiceError> {
    let media = state.services.catalog.list_media(id).await?;
    Ok(ok(media))
}

#[utoipa::path(
    post,
    path = "/api/layanan",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = ApiResponse<ServiceView>),
        (status = 400, description = "Invalid input or duplicate slug", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Layanan"
)]
pub async fn create_service(
    State(state): State<AppState>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceView>>), ServiceError> {
    let service = state.services.catalog.create(request).await?;
    Ok(created(service))
}

#[utoipa::path(
    put,
    path = "/api/layanan/{id}",
    params(("id" = Uuid, Path, description = "Service id")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = ApiResponse<ServiceView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Layanan"
)]
pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateServiceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ServiceView>>), ServiceError> {
    let service = state.services.catalog.update(id, request).await?;
    Ok(ok(service))
}

/// Delete a service that has no bookings, with its media files
#[utoipa::path(
    delete,
    path = "/api/layanan/{id}",
    params(("id" = Uuid, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service deleted"),
        (status = 400, description = "Service has bookings", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Layanan"
)]
pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state.services.catalog.delete(id).await?;
    Ok(message("Service deleted"))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/", get(list_services))
        .route("/:id", get(get_service))
        .route("/:id/media", get(list_service_media))
        .with_optional_auth();

    let admin = Router::new()
        .route("/", post(create_service))
        .route("/:id", put(update_service).delete(delete_service))
        .with_role(Role::Admin);

    public.merge(admin)
}
