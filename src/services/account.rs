use crate::{
    auth::{
        hash_password, verify_password, AuthError, AuthService, AuthUser, Role, TokenPair,
        TokenSubject,
    },
    entities::{admin, customer},
    errors::ServiceError,
    storage::{public_url, UploadFolder},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Indonesian mobile numbers: `+62`, `62` or `0`, then `8`, then 8 to 12 more digits.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+62|62|0)8[1-9][0-9]{7,11}$").expect("phone pattern compiles")
});

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(phone.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("must be an Indonesian mobile number (+62/62/0 followed by 8)".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(custom = "validate_phone")]
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "must be at least 8 characters"))]
    pub new_password: String,
}

/// Public view of an admin or customer
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PrincipalProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<admin::Model> for PrincipalProfile {
    fn from(model: admin::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: Role::Admin,
            phone: None,
            profile_photo: None,
            profile_photo_url: None,
            created_at: model.created_at,
        }
    }
}

impl From<customer::Model> for PrincipalProfile {
    fn from(model: customer::Model) -> Self {
        let profile_photo_url = model
            .profile_photo
            .as_deref()
            .map(|file| public_url(UploadFolder::Profiles, file));
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: Role::Customer,
            phone: Some(model.phone),
            profile_photo: model.profile_photo,
            profile_photo_url,
            created_at: model.created_at,
        }
    }
}

impl PrincipalProfile {
    fn token_subject(&self) -> TokenSubject {
        TokenSubject {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: PrincipalProfile,
    pub tokens: TokenPair,
}

/// Registration, login and token lifecycle for both principal tables
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
}

impl AccountService {
    pub fn new(db: Arc<DatabaseConnection>, auth: Arc<AuthService>) -> Self {
        Self { db, auth }
    }

    fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    async fn email_taken(&self, email: &str) -> Result<bool, ServiceError> {
        let db = &*self.db;
        let admin = admin::Entity::find()
            .filter(admin::Column::Email.eq(email))
            .one(db)
            .await?;
        if admin.is_some() {
            return Ok(true);
        }
        let customer = customer::Entity::find()
            .filter(customer::Column::Email.eq(email))
            .one(db)
            .await?;
        Ok(customer.is_some())
    }

    /// Registers a customer and signs them in
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let email = Self::normalize_email(&input.email);

        if self.email_taken(&email).await? {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }

        let now = Utc::now();
        let model = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            phone: Set(input.phone.trim().to_string()),
            profile_photo: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, "Email is already registered"))?;

        counter!("accounts_registered_total", 1);
        info!(customer_id = %model.id, "Customer registered");

        let user = PrincipalProfile::from(model);
        let tokens = self.auth.issue_tokens(&user.token_subject())?;
        Ok(AuthResponse { user, tokens })
    }

    /// Admin table first, then customers. Failures never reveal which part was wrong.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginRequest) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let email = Self::normalize_email(&input.email);
        let db = &*self.db;

        let user = if let Some(admin) = admin::Entity::find()
            .filter(admin::Column::Email.eq(&email))
            .one(db)
            .await?
        {
            if !verify_password(&input.password, &admin.password_hash) {
                return Err(self.reject_login(&email));
            }
            PrincipalProfile::from(admin)
        } else if let Some(customer) = customer::Entity::find()
            .filter(customer::Column::Email.eq(&email))
            .one(db)
            .await?
        {
            if !verify_password(&input.password, &customer.password_hash) {
                return Err(self.reject_login(&email));
            }
            PrincipalProfile::from(customer)
        } else {
            return Err(self.reject_login(&email));
        };

        let tokens = self.auth.issue_tokens(&user.token_subject())?;
        counter!("logins_total", 1, "role" => user.role.to_string());
        info!(principal_id = %user.id, role = %user.role, "Login succeeded");
        Ok(AuthResponse { user, tokens })
    }

    fn reject_login(&self, email: &str) -> ServiceError {
        counter!("login_failures_total", 1);
        warn!(email, "Login rejected");
        AuthError::InvalidCredentials.into()
    }

    async fn load_profile(
        &self,
        id: Uuid,
        role: Role,
    ) -> Result<Option<PrincipalProfile>, ServiceError> {
        let db = &*self.db;
        Ok(match role {
            Role::Admin => admin::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(PrincipalProfile::from),
            Role::Customer => customer::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(PrincipalProfile::from),
        })
    }

    /// Current principal, re-read from its table
    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn me(&self, user: &AuthUser) -> Result<PrincipalProfile, ServiceError> {
        self.load_profile(user.id, user.role)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Account no longer exists".to_string()))
    }

    /// Exchanges a refresh token for a new pair; the old refresh token is revoked.
    #[instrument(skip(self, input))]
    pub async fn refresh(&self, input: RefreshRequest) -> Result<AuthResponse, ServiceError> {
        input.validate()?;
        let claims = self.auth.validate_refresh_token(&input.refresh_token).await?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .load_profile(id, claims.role)
            .await?
            .ok_or_else(|| ServiceError::InvalidToken("Account no longer exists".to_string()))?;

        self.auth.revoke(&claims.jti, claims.exp).await;
        let tokens = self.auth.issue_tokens(&user.token_subject())?;
        info!(principal_id = %user.id, "Token pair refreshed");
        Ok(AuthResponse { user, tokens })
    }

    /// Revokes the access token the request was made with
    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn logout(&self, user: &AuthUser) -> Result<(), ServiceError> {
        self.auth.revoke(&user.token_id, user.expires_at).await;
        info!("Access token revoked");
        Ok(())
    }

    #[instrument(skip(self, user, input), fields(principal_id = %user.id))]
    pub async fn change_password(
        &self,
        user: &AuthUser,
        input: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        input.validate()?;
        let db = &*self.db;
        let new_hash = hash_password(&input.new_password)?;

        match user.role {
            Role::Admin => {
                let model = admin::Entity::find_by_id(user.id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Admin not found".to_string()))?;
                if !verify_password(&input.current_password, &model.password_hash) {
                    return Err(ServiceError::ValidationError(
                        "Current password is incorrect".to_string(),
                    ));
                }
                let mut active: admin::ActiveModel = model.into();
                active.password_hash = Set(new_hash);
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
            }
            Role::Customer => {
                let model = customer::Entity::find_by_id(user.id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("Customer not found".to_string()))?;
                if !verify_password(&input.current_password, &model.password_hash) {
                    return Err(ServiceError::ValidationError(
                        "Current password is incorrect".to_string(),
                    ));
                }
                let mut active: customer::ActiveModel = model.into();
                active.password_hash = Set(new_hash);
                active.updated_at = Set(Utc::now());
                active.update(db).await?;
            }
        }

        info!("Password changed");
        Ok(())
    }

    /// Creates the configured admin once; an existing email is left untouched.
    #[instrument(skip(self, password))]
    pub async fn seed_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<admin::Model>, ServiceError> {
        let email = Self::normalize_email(email);
        let existing = admin::Entity::find()
            .filter(admin::Column::Email.eq(&email))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Ok(None);
        }

        let now = Utc::now();
        let model = admin::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email),
            password_hash: Set(hash_password(password)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(admin_id = %model.id, "Seeded admin account");
        Ok(Some(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("+6281234567890", true)]
    #[case("6281234567890", true)]
    #[case("081234567890", true)]
    #[case("08123456", false)]
    #[case("+6571234567", false)]
    #[case("0812345678901234", false)]
    #[case("+62 812 3456 7890", false)]
    fn phone_numbers(#[case] phone: &str, #[case] ok: bool) {
        assert_eq!(validate_phone(phone).is_ok(), ok, "{}", phone);
    }

    #[test]
    fn registration_reports_each_bad_field() {
        let err = RegisterRequest {
            name: "R".into(),
            email: "not-an-email".into(),
            password: "short".into(),
            phone: "12345".into(),
        }
        .validate()
        .unwrap_err();
        let fields = err.field_errors();
        for field in ["name", "email", "password", "phone"] {
            assert!(fields.contains_key(field), "missing {}", field);
        }
    }
}
