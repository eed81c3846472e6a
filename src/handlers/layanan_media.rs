use crate::auth::{AuthRouterExt, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, message, ok, read_upload};
use crate::handlers::AppState;
use crate::services::catalog::{AddMediaInput, MediaView, UpdateMediaRequest};
use crate::ApiResponse;
use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use std::str::FromStr;
use uuid::Uuid;

fn parse_field<T: FromStr>(raw: Option<&str>, name: &str) -> Result<Option<T>, ServiceError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|_| ServiceError::ValidationError(format!("{} is invalid", name)))
    })
    .transpose()
}

/// Upload an image or video for a service.
///
/// Multipart fields: `file`, `service_id`, optional `media_type` (`image`|`video`),
/// `position` and `caption`.
#[utoipa::path(
    post,
    path = "/api/layanan-media",
    responses(
        (status = 201, description = "Media stored", body = ApiResponse<MediaView>),
        (status = 400, description = "Invalid file or fields", body = crate::errors::ErrorResponse),
        (status = 404, description = "Service not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Layanan Media"
)]
pub async fn add_media(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<MediaView>>), ServiceError> {
    let form = read_upload(multipart).await?;
    let service_id: Uuid = parse_field(form.field("service_id"), "service_id")?
        .ok_or_else(|| ServiceError::ValidationError("service_id is required".to_string()))?;
    let media_type = form
        .field("media_type")
        .map(|raw| serde_json::from_value(serde_json::Value::String(raw.trim().to_string())))
        .transpose()
        .map_err(|_| ServiceError::ValidationError("media_type is invalid".to_string()))?;
    let input = AddMediaInput {
        media_type,
        position: parse_field(form.field("position"), "position")?,
        caption: form.field("caption").map(str::to_string),
    };

    let media = state
        .services
        .catalog
        .add_media(service_id, input, &form.filename, &form.bytes)
        .await?;
    Ok(created(media))
}

#[utoipa::path(
    get,
    path = "/api/layanan-media/{id}",
    params(("id" = Uuid, Path, description = "Media id")),
    responses(
        (status = 200, description = "Media", body = ApiResponse<MediaView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Layanan Media"
)]
pub async fn get_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<MediaView>>), ServiceError> {
    let media = state.services.catalog.get_media(id).await?;
    Ok(ok(media))
}

#[utoipa::path(
    get,
    path = "/api/layanan-media/service/{service_id}",
    params(("service_id" = Uuid, Path, description = "Service id")),
    responses((status = 200, description = "Media ordered by position", body = ApiResponse<Vec<MediaView>>)),
    tag = "Layanan Media"
)]
pub async fn list_for_service(
    State(state): State<AppState>,
    Path(service_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<MediaView>>>), ServiceError> {
    let media = state.services.catalog.list_media(service_id).await?;
    Ok(ok(media))
}

/// Reorder or recaption a media item
#[utoipa::path(
    put,
    path = "/api/layanan-media/{id}",
    params(("id" = Uuid, Path, description = "Media id")),
    request_body = UpdateMediaRequest,
    responses(
        (status = 200, description = "Media updated", body = ApiResponse<MediaView>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Layanan Media"
)]
pub async fn update_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMediaRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MediaView>>), ServiceError> {
    let media = state.services.catalog.update_media(id, request).await?;
    Ok(ok(media))
}

#[utoipa::path(
    delete,
    path = "/api/layanan-media/{id}",
    params(("id" = Uuid, Path, description = "Media id")),
    responses((status = 200, description = "Media and its file removed")),
    security(("bearer_auth" = [])),
    tag = "Layanan Media"
)]
pub async fn delete_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state.services.catalog.delete_media(id).await?;
    Ok(message("Media deleted"))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/:id", get(get_media))
        .route("/service/:service_id", get(list_for_service));

    let admin = Router::new()
        .route("/", post(add_media))
        .route("/:id", put(update_media).delete(delete_media))
        .with_role(Role::Admin);

    public.merge(admin)
}
