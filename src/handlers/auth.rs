use crate::auth::{AuthRouterExt, AuthUser};
use crate::errors::ServiceError;
use crate::handlers::common::{created, message, ok};
use crate::handlers::AppState;
use crate::services::account::{
    AuthResponse, ChangePasswordRequest, LoginRequest, PrincipalProfile, RefreshRequest,
    RegisterRequest,
};
use crate::ApiResponse;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

/// Register a customer account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid input or email already registered", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let response = state.services.accounts.register(request).await?;
    Ok(created(response))
}

/// Log in as an admin or a customer
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let response = state.services.accounts.login(request).await?;
    Ok(ok(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = ApiResponse<AuthResponse>),
        (status = 403, description = "Invalid or expired refresh token", body = crate::errors::ErrorResponse),
    ),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let response = state.services.accounts.refresh(request).await?;
    Ok(ok(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = ApiResponse<PrincipalProfile>),
        (status = 401, description = "Missing token", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<PrincipalProfile>>), ServiceError> {
    let profile = state.services.accounts.me(&user).await?;
    Ok(ok(profile))
}

/// Revoke the access token used for this request
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state.services.accounts.logout(&user).await?;
    Ok(message("Logged out"))
}

#[utoipa::path(
    put,
    path = "/api/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is wrong", body = crate::errors::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ServiceError> {
    state
        .services
        .accounts
        .change_password(&user, request)
        .await?;
    Ok(message("Password changed"))
}

pub fn routes() -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh));

    let authenticated = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route("/password", put(change_password))
        .with_auth();

    public.merge(authenticated)
}
