use crate::auth::{AuthRouterExt, AuthUser, Role};
use crate::errors::ServiceError;
use crate::handlers::common::{created, message, read_upload};
use crate::handlers::AppState;
use crate::storage::{content_type_for, StoredFile, UploadFolder};
use crate::ApiResponse;
use axum::{
    extract::{Json, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Router,
};
use std::str::FromStr;
use tracing::info;

/// Folders a customer may write into directly
const CUSTOMER_FOLDERS: [UploadFolder; 2] = [UploadFolder::Payments, UploadFolder::Profiles];

fn parse_folder(raw: &str) -> Result<UploadFolder, ServiceError> {
    UploadFolder::from_str(raw)
        .map_err(|_| ServiceError::BadRequest(format!("Unknown upload folder: {}", raw)))
}

/// Store a file in one of the typed upload folders (multipart field `file`)
#[utoipa::path(
    post,
    path = "/api/upload/{folder}",
    params(("folder" = UploadFolder, Path, description = "Target folder")),
    responses(
        (status = 201, description = "File stored", body = ApiResponse<StoredFile>),
        (status = 400, description = "Unknown folder, empty file or extension not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Folder not writable by the caller", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn upload_file(
    State(state): State<AppState>,
    user: AuthUser,
    Path(folder): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<StoredFile>>), ServiceError> {
    let folder = parse_folder(&folder)?;
    if !user.is_admin() && !CUSTOMER_FOLDERS.contains(&folder) {
        return Err(ServiceError::Forbidden(format!(
            "Uploads to {} are restricted to admins",
            folder
        )));
    }
    let form = read_upload(multipart).await?;
    let stored = state
        .services
        .files
        .save(folder, &form.filename, &form.bytes)
        .await?;
    info!(folder = %folder, filename = %stored.filename, user_id = %user.id, "File uploaded");
    Ok(created(stored))
}

#[utoipa::path(
    get,
    path = "/api/upload/{folder}/{name}",
    params(
        ("folder" = UploadFolder, Path, description = "Folder"),
        ("name" = String, Path, description = "Stored file name"),
    ),
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Upload"
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path((folder, name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let folder = parse_folder(&folder)?;
    let bytes = state.services.files.read(folder, &name).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}

#[utoipa::path(
    delete,
    path = "/api/upload/{folder}/{name}",
    params(
        ("folder" = UploadFolder, Path, description = "Folder"),
        ("name" = String, Path, description = "Stored file name"),
    ),
    responses(
        (status = 200, description = "File removed"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path((folder, name)): Path<(String, String)>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    let folder = parse_folder(&folder)?;
    if !state.services.files.delete(folder, &name).await? {
        return Err(ServiceError::NotFound(format!(
            "File {}/{} not found",
            folder, name
        )));
    }
    Ok(message("File deleted"))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new().route("/:folder/:name", get(download_file));

    let authenticated = Router::new()
        .route("/:folder", post(upload_file))
        .with_auth();

    let admin = Router::new()
        .route("/:folder/:name", delete(delete_file))
        .with_role(Role::Admin);

    public.merge(authenticated).merge(admin)
}
