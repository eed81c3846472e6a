use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{message, ok, paginated, read_upload};
use crate::handlers::AppState;
use crate::services::account::PrincipalProfile;
use crate::services::customers::{CustomerListQuery, UpdateProfileRequest};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

/// List customers (admin)
#[utoipa::path(
    get,
    path = "/api/pengguna",
    params(CustomerListQuery),
    responses((status = 200, description = "Customers", body = ApiResponse<PaginatedResponse<PrincipalProfile>>)),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerListQuery>,
) -> Result<(StatusCode, Json<ApiResponse<PaginatedResponse<PrincipalProfile>>>), ServiceError> {
    let (page, limit) = (query.page, query.limit);
    let result = state.services.customers.list(query).await?;
    Ok(paginated(result, page, limit))
}

#[utoipa::path(
    get,
    path = "/api/pengguna/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer", body = ApiResponse<PrincipalProfile>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), ServiceError> {
    let profile = state.services.customers.get_profile(id).await?;
    Ok(ok(profile))
}

/// Delete a customer with their bookings, meetings, payments and files (admin)
#[utoipa::path(
    delete,
    path = "/api/pengguna/{id}",
    params(("id" = Uuid, Path, description = "Customer id")),
    responses(
        (status = 200, description = "Customer deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state.services.customers.delete(id).await?;
    Ok(message("Customer deleted"))
}

#[utoipa::path(
    get,
    path = "/api/pengguna/profile",
    responses((status = 200, description = "Own profile", body = ApiResponse<PrincipalProfile>)),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), ServiceError> {
    let profile = state.services.customers.get_profile(user.id).await?;
    Ok(ok(profile))
}

#[utoipa::path(
    put,
    path = "/api/pengguna/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<PrincipalProfile>),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), ServiceError> {
    let profile = state
        .services
        .customers
        .update_profile(user.id, request)
        .await?;
    Ok(ok(profile))
}

/// Replace the profile photo (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/pengguna/profile/photo",
    responses(
        (status = 200, description = "Photo stored", body = ApiResponse<PrincipalProfile>),
        (status = 400, description = "Invalid file", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Pengguna"
)]
pub async fn upload_photo(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), ServiceError> {
    let form = read_upload(multipart).await?;
    let profile = state
        .services
        .customers
        .upload_photo(user.id, &form.filename, &form.bytes)
        .await?;
    Ok(ok(profile))
}

pub fn routes() -> Router<AppState> {
    let own = Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/photo", post(upload_photo))
        .with_role(Role::Customer);

    let admin = Router::new()
        .route("/", get(list_customers))
        .route("/:id", get(get_customer).delete(delete_customer))
        .with_role(Role::Admin);

    own.merge(admin)
}
