/*!
 * # Authentication and Authorization Module
 *
 * Bearer-token authentication for the two principal kinds of the studio API:
 *
 * - Admins, seeded from configuration
 * - Customers ("pengguna"), created through registration
 *
 * Tokens are HS256 JWTs. Access tokens authenticate requests; refresh tokens
 * are exchanged for a new pair. Role gating is done with router extensions.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

mod password;

pub use password::{hash_password, verify_password};

/// Principal kind carried in every token
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, strum::Display,
)]
pub enum Role {
    #[serde(rename = "admin")]
    #[strum(serialize = "admin")]
    Admin,
    #[serde(rename = "pengguna")]
    #[strum(serialize = "pengguna")]
    Customer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
    Access,
    Refresh,
}

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,         // Principal id
    pub name: String,        // Display name
    pub email: String,       // Login email
    pub role: Role,          // Table the principal lives in
    pub token_use: TokenUse, // Access or refresh
    pub jti: String,         // Unique token id, used for revocation
    pub iat: i64,            // Issued at time
    pub exp: i64,            // Expiration time
    pub nbf: i64,            // Not valid before time
    pub iss: String,         // Issuer
    pub aud: String,         // Audience
}

/// Identity a token pair is issued for
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Authenticated principal extracted from an access token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub token_id: String,
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    /// Fails with `Forbidden` unless the caller is a customer.
    pub fn require_customer(&self) -> Result<Uuid, ServiceError> {
        if self.is_customer() {
            Ok(self.id)
        } else {
            Err(ServiceError::Forbidden(
                "This action is only available to customers".to_string(),
            ))
        }
    }

    /// Fails with `Forbidden` unless the caller is an admin.
    pub fn require_admin(&self) -> Result<Uuid, ServiceError> {
        if self.is_admin() {
            Ok(self.id)
        } else {
            Err(ServiceError::Forbidden("Admin access required".to_string()))
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            Duration::from_secs(cfg.refresh_token_expiration as u64),
        )
    }
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    revoked_tokens: Arc<RwLock<Vec<RevokedToken>>>,
}

/// Revocation list entry; dropped once the token would have expired anyway
#[derive(Clone, Debug)]
struct RevokedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            revoked_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Issue an access/refresh pair for a principal
    pub fn issue_tokens(&self, subject: &TokenSubject) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let access_token = self.encode_claims(subject, TokenUse::Access, now, access_exp)?;
        let refresh_token = self.encode_claims(subject, TokenUse::Refresh, now, refresh_exp)?;

        debug!(subject = %subject.id, role = %subject.role, "Issued token pair");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    fn encode_claims(
        &self,
        subject: &TokenSubject,
        token_use: TokenUse,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.id.to_string(),
            name: subject.name.clone(),
            email: subject.email.clone(),
            role: subject.role,
            token_use,
            jti: Uuid::new_v4().to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            nbf: issued_at.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.validate_nbf = true;

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_revoked(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Validate an access token and build the request principal
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token).await?;
        if claims.token_use != TokenUse::Access {
            return Err(AuthError::WrongTokenUse);
        }
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthUser {
            id,
            name: claims.name,
            email: claims.email,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }

    /// Validate a refresh token; the caller re-issues once the principal is confirmed.
    pub async fn validate_refresh_token(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self.validate_token(token).await?;
        if claims.token_use != TokenUse::Refresh {
            return Err(AuthError::WrongTokenUse);
        }
        Ok(claims)
    }

    /// Put a token id on the revocation list until it expires
    pub async fn revoke(&self, jti: &str, exp: i64) {
        let expiry = DateTime::<Utc>::from_timestamp(exp, 0).unwrap_or_else(Utc::now);
        let mut revoked = self.revoked_tokens.write().await;
        revoked.push(RevokedToken {
            jti: jti.to_string(),
            expiry,
        });
        Self::clean_revoked(&mut revoked);
    }

    async fn is_token_revoked(&self, token_id: &str) -> bool {
        let revoked = self.revoked_tokens.read().await;
        revoked.iter().any(|t| t.jti == token_id)
    }

    fn clean_revoked(revoked: &mut Vec<RevokedToken>) {
        let now = Utc::now();
        revoked.retain(|t| t.expiry > now);
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token cannot be used for this purpose")]
    WrongTokenUse,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ServiceError::Unauthorized("Invalid email or password".to_string())
            }
            AuthError::MissingToken => ServiceError::MissingToken,
            AuthError::InvalidToken => {
                ServiceError::InvalidToken("Invalid authentication token".to_string())
            }
            AuthError::TokenExpired => ServiceError::InvalidToken("Token has expired".to_string()),
            AuthError::RevokedToken => {
                ServiceError::InvalidToken("Authentication token has been revoked".to_string())
            }
            AuthError::WrongTokenUse => {
                ServiceError::InvalidToken("Token cannot be used for this purpose".to_string())
            }
            AuthError::InsufficientPermissions => {
                ServiceError::Forbidden("Insufficient permissions".to_string())
            }
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ServiceError::MissingToken)
    }
}

/// Pulls the bearer token out of the Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user,
        None => return Err(AuthError::MissingToken),
    };

    if user.role != required_role {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token and stores the principal
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Like `auth_middleware` but lets anonymous requests through. A token that is
/// present but unusable is still rejected.
pub async fn optional_auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = request.extensions().get::<Arc<AuthService>>().cloned();
    let token = bearer_token(request.headers()).map(str::to_string);

    if let (Some(service), Some(token)) = (auth_service, token) {
        match service.authenticate(&token).await {
            Ok(user) => {
                request.extensions_mut().insert(user);
            }
            Err(e) => return e.into_response(),
        }
    }

    next.run(request).await
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_optional_auth(self) -> Self;
    fn with_role(self, role: Role) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_optional_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(optional_auth_middleware))
    }

    fn with_role(self, role: Role) -> Self {
        self.layer(axum::middleware::from_fn_with_state(role, role_middleware))
            .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "k3Jq9vX2mP7rT4wY8zB1nC6dF0gH5jL3sQ9uV2xA7eR4tY8iO1pW6mN3bZ5cK0lM".to_string(),
            "studio-booking-api".to_string(),
            "studio-booking-auth".to_string(),
            Duration::from_secs(900),
            Duration::from_secs(3600),
        ))
    }

    fn subject(role: Role) -> TokenSubject {
        TokenSubject {
            id: Uuid::new_v4(),
            name: "Sari".to_string(),
            email: "sari@example.com".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn access_token_round_trip_keeps_role() {
        let auth = service();
        let who = subject(Role::Customer);
        let pair = auth.issue_tokens(&who).unwrap();

        let user = auth.authenticate(&pair.access_token).await.unwrap();
        assert_eq!(user.id, who.id);
        assert_eq!(user.role, Role::Customer);
        assert_eq!(pair.token_type, "Bearer");
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let auth = service();
        let pair = auth.issue_tokens(&subject(Role::Admin)).unwrap();

        assert_matches!(
            auth.authenticate(&pair.refresh_token).await,
            Err(AuthError::WrongTokenUse)
        );
        assert_matches!(
            auth.validate_refresh_token(&pair.access_token).await,
            Err(AuthError::WrongTokenUse)
        );
        assert!(auth.validate_refresh_token(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let auth = service();
        let pair = auth.issue_tokens(&subject(Role::Customer)).unwrap();
        let claims = auth.validate_token(&pair.access_token).await.unwrap();
        auth.revoke(&claims.jti, claims.exp).await;

        assert_matches!(
            auth.authenticate(&pair.access_token).await,
            Err(AuthError::RevokedToken)
        );
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_invalid() {
        let auth = service();
        let mut other_config = auth.config.clone();
        other_config.jwt_secret =
            "Zx8Wq2Lm5Nv7Bc1Df4Gh6Jk9Pr3St0Uy2Io5Ae8Qw1Er4Ty7Ui0Op3As6Df9Gh2Jk".to_string();
        let other = AuthService::new(other_config);
        let pair = other.issue_tokens(&subject(Role::Admin)).unwrap();

        assert_matches!(
            auth.authenticate(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn auth_errors_map_to_http_statuses() {
        use axum::http::StatusCode;
        assert_eq!(
            ServiceError::from(AuthError::MissingToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::from(AuthError::TokenExpired).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::from(AuthError::InsufficientPermissions).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn role_serializes_with_indonesian_customer_name() {
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"pengguna\"");
        assert_eq!(Role::Admin.to_string(), "admin");
    }
}
