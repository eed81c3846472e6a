use crate::{
    entities::{
        booking,
        service::{self, ServiceCategory},
        service_media::{self, MediaType},
    },
    errors::ServiceError,
    services::{non_blank, page_bounds},
    storage::{extension_of, public_url, FileStore, UploadFolder},
};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("slug pattern compiles"));

fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_PATTERN.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug");
        err.message = Some("must be lowercase words separated by single dashes".into());
        Err(err)
    }
}

pub(crate) fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("amount");
        err.message = Some("must be greater than zero".into());
        Err(err)
    }
}

/// Lowercase ASCII words joined by single dashes, e.g. "Drone & Aerial" -> "drone-aerial".
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ServiceListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<ServiceCategory>,
    pub featured: Option<bool>,
    pub search: Option<String>,
    /// Honoured for admins only
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateServiceRequest {
    #[validate(length(min = 2, max = 150, message = "must be 2-150 characters"))]
    pub name: String,
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    pub category: ServiceCategory,
    #[validate(length(min = 1, message = "is required"))]
    pub description: String,
    #[validate(custom = "validate_positive_amount")]
    pub price_from: Decimal,
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub turnaround: String,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 2, max = 150, message = "must be 2-150 characters"))]
    pub name: Option<String>,
    #[validate(custom = "validate_slug")]
    pub slug: Option<String>,
    pub category: Option<ServiceCategory>,
    pub description: Option<String>,
    #[validate(custom = "validate_positive_amount")]
    pub price_from: Option<Decimal>,
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    pub turnaround: Option<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

/// Metadata sent alongside a media upload
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AddMediaInput {
    pub media_type: Option<MediaType>,
    pub position: Option<i32>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMediaRequest {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub position: Option<i32>,
    #[validate(length(max = 255, message = "must be at most 255 characters"))]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MediaView {
    pub id: Uuid,
    pub service_id: Uuid,
    pub media_type: MediaType,
    pub file: String,
    pub url: String,
    pub position: i32,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<service_media::Model> for MediaView {
    fn from(model: service_media::Model) -> Self {
        let url = public_url(media_folder(model.media_type), &model.file);
        Self {
            id: model.id,
            service_id: model.service_id,
            media_type: model.media_type,
            file: model.file,
            url,
            position: model.position,
            caption: model.caption,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: ServiceCategory,
    pub description: String,
    #[schema(value_type = String, example = "1000000.00")]
    pub price_from: Decimal,
    pub turnaround: String,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<MediaView>>,
}

impl From<service::Model> for ServiceView {
    fn from(model: service::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            category: model.category,
            description: model.description,
            price_from: model.price_from,
            turnaround: model.turnaround,
            is_active: model.is_active,
            is_featured: model.is_featured,
            created_at: model.created_at,
            updated_at: model.updated_at,
            media: None,
        }
    }
}

fn media_folder(media_type: MediaType) -> UploadFolder {
    match media_type {
        MediaType::Image => UploadFolder::Images,
        MediaType::Video => UploadFolder::Videos,
    }
}

/// Guesses the media type from the file extension.
fn media_type_for(filename: &str) -> Option<MediaType> {
    let extension = extension_of(filename)?;
    if UploadFolder::Images
        .allowed_extensions()
        .contains(&extension.as_str())
    {
        Some(MediaType::Image)
    } else if UploadFolder::Videos
        .allowed_extensions()
        .contains(&extension.as_str())
    {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Service offerings ("layanan") and their media
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStore>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, files: Arc<FileStore>) -> Self {
        Self { db, files }
    }

    async fn find(&self, service_id: Uuid) -> Result<service::Model, ServiceError> {
        service::Entity::find_by_id(service_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", service_id)))
    }

    async fn ensure_slug_free(
        &self,
        slug: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = service::Entity::find().filter(service::Column::Slug.eq(slug));
        if let Some(id) = except {
            query = query.filter(service::Column::Id.ne(id));
        }
        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Slug '{}' already exists", slug)));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ServiceListQuery,
        is_admin: bool,
    ) -> Result<(Vec<ServiceView>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let mut select = service::Entity::find();

        if !(is_admin && query.include_inactive.unwrap_or(false)) {
            select = select.filter(service::Column::IsActive.eq(true));
        }
        if let Some(category) = query.category {
            select = select.filter(service::Column::Category.eq(category));
        }
        if let Some(featured) = query.featured {
            select = select.filter(service::Column::IsFeatured.eq(featured));
        }
        if let Some(term) = non_blank(query.search) {
            select = select.filter(
                Condition::any()
                    .add(service::Column::Name.contains(&term))
                    .add(service::Column::Description.contains(&term)),
            );
        }

        let paginator = select
            .order_by_desc(service::Column::IsFeatured)
            .order_by_asc(service::Column::Name)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let services = paginator.fetch_page(page - 1).await?;

        Ok((services.into_iter().map(ServiceView::from).collect(), total))
    }

    /// Looks a service up by id or slug. Inactive services are hidden from the public.
    #[instrument(skip(self))]
    pub async fn get(&self, id_or_slug: &str, is_admin: bool) -> Result<ServiceView, ServiceError> {
        let found = match Uuid::parse_str(id_or_slug) {
            Ok(id) => service::Entity::find_by_id(id).one(&*self.db).await?,
            Err(_) => {
                service::Entity::find()
                    .filter(service::Column::Slug.eq(id_or_slug))
                    .one(&*self.db)
                    .await?
            }
        };
        let model = found
            .filter(|s| s.is_active || is_admin)
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", id_or_slug)))?;

        let media = self.list_media(model.id).await?;
        let mut view = ServiceView::from(model);
        view.media = Some(media);
        Ok(view)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateServiceRequest) -> Result<ServiceView, ServiceError> {
        input.validate()?;
        let slug = match non_blank(input.slug) {
            Some(slug) => slug,
            None => slugify(&input.name),
        };
        if slug.is_empty() {
            return Err(ServiceError::ValidationError(
                "A slug could not be derived from the name".to_string(),
            ));
        }
        self.ensure_slug_free(&slug, None).await?;

        let now = Utc::now();
        let model = service::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            slug: Set(slug.clone()),
            category: Set(input.category),
            description: Set(input.description),
            price_from: Set(input.price_from),
            turnaround: Set(input.turnaround),
            is_active: Set(input.is_active.unwrap_or(true)),
            is_featured: Set(input.is_featured.unwrap_or(false)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            ServiceError::from_db_conflict(e, format!("Slug '{}' already exists", slug))
        })?;

        info!(service_id = %model.id, slug = %model.slug, "Service created");
        Ok(model.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        service_id: Uuid,
        input: UpdateServiceRequest,
    ) -> Result<ServiceView, ServiceError> {
        input.validate()?;
        let model = self.find(service_id).await?;
        let mut active: service::ActiveModel = model.into();

        if let Some(slug) = non_blank(input.slug) {
            self.ensure_slug_free(&slug, Some(service_id)).await?;
            active.slug = Set(slug);
        }
        if let Some(name) = non_blank(input.name) {
            active.name = Set(name);
        }
        if let Some(category) = input.category {
            active.category = Set(category);
        }
        if let Some(description) = non_blank(input.description) {
            active.description = Set(description);
        }
        if let Some(price_from) = input.price_from {
            active.price_from = Set(price_from);
        }
        if let Some(turnaround) = non_blank(input.turnaround) {
            active.turnaround = Set(turnaround);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(is_featured) = input.is_featured {
            active.is_featured = Set(is_featured);
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&*self.db)
            .await
            .map_err(|e| ServiceError::from_db_conflict(e, "Slug already exists"))?;
        info!(service_id = %service_id, "Service updated");
        Ok(updated.into())
    }

    /// Removes a service and its media. Services with bookings must be deactivated instead.
    #[instrument(skip(self))]
    pub async fn delete(&self, service_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        service::Entity::find_by_id(service_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", service_id)))?;

        let bookings = booking::Entity::find()
            .filter(booking::Column::ServiceId.eq(service_id))
            .count(&txn)
            .await?;
        if bookings > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Service has {} booking(s); deactivate it instead",
                bookings
            )));
        }

        let media = service_media::Entity::find()
            .filter(service_media::Column::ServiceId.eq(service_id))
            .all(&txn)
            .await?;
        service_media::Entity::delete_many()
            .filter(service_media::Column::ServiceId.eq(service_id))
            .exec(&txn)
            .await?;
        service::Entity::delete_by_id(service_id).exec(&txn).await?;
        txn.commit().await?;

        for item in &media {
            self.files
                .remove_quietly(media_folder(item.media_type), Some(&item.file))
                .await;
        }
        info!(service_id = %service_id, media_removed = media.len(), "Service deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_media(&self, service_id: Uuid) -> Result<Vec<MediaView>, ServiceError> {
        let media = service_media::Entity::find()
            .filter(service_media::Column::ServiceId.eq(service_id))
            .order_by_asc(service_media::Column::Position)
            .order_by_asc(service_media::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(media.into_iter().map(MediaView::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_media(&self, media_id: Uuid) -> Result<MediaView, ServiceError> {
        service_media::Entity::find_by_id(media_id)
            .one(&*self.db)
            .await?
            .map(MediaView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Media {} not found", media_id)))
    }

    /// Stores an image or video for a service; new media goes last unless a position is given.
    #[instrument(skip(self, input, bytes), fields(size = bytes.len()))]
    pub async fn add_media(
        &self,
        service_id: Uuid,
        input: AddMediaInput,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<MediaView, ServiceError> {
        input.validate()?;
        self.find(service_id).await?;

        let media_type = match input.media_type.or_else(|| media_type_for(original_name)) {
            Some(media_type) => media_type,
            None => {
                return Err(ServiceError::ValidationError(
                    "Media must be an image or a video".to_string(),
                ))
            }
        };
        let folder = media_folder(media_type);
        let stored = self.files.save(folder, original_name, bytes).await?;

        let position = match input.position {
            Some(position) => position,
            None => {
                let last: Option<i32> = service_media::Entity::find()
                    .select_only()
                    .column_as(service_media::Column::Position.max(), "max_position")
                    .filter(service_media::Column::ServiceId.eq(service_id))
                    .into_tuple::<Option<i32>>()
                    .one(&*self.db)
                    .await?
                    .flatten();
                last.map(|p| p + 1).unwrap_or(0)
            }
        };

        let now = Utc::now();
        let inserted = service_media::ActiveModel {
            id: Set(Uuid::new_v4()),
            service_id: Set(service_id),
            media_type: Set(media_type),
            file: Set(stored.filename.clone()),
            position: Set(position),
            caption: Set(non_blank(input.caption)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await;

        match inserted {
            Ok(model) => {
                info!(service_id = %service_id, media_id = %model.id, "Media added");
                Ok(model.into())
            }
            Err(e) => {
                self.files.remove_quietly(folder, Some(&stored.filename)).await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, input))]
    pub async fn update_media(
        &self,
        media_id: Uuid,
        input: UpdateMediaRequest,
    ) -> Result<MediaView, ServiceError> {
        input.validate()?;
        let model = service_media::Entity::find_by_id(media_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Media {} not found", media_id)))?;

        let mut active: service_media::ActiveModel = model.into();
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        if let Some(caption) = input.caption {
            active.caption = Set(non_blank(Some(caption)));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_media(&self, media_id: Uuid) -> Result<(), ServiceError> {
        let model = service_media::Entity::find_by_id(media_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Media {} not found", media_id)))?;

        service_media::Entity::delete_by_id(media_id)
            .exec(&*self.db)
            .await?;
        self.files
            .remove_quietly(media_folder(model.media_type), Some(&model.file))
            .await;
        info!(media_id = %media_id, "Media deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Prewedding Outdoor", "prewedding-outdoor")]
    #[case("  Drone & Aerial  Video ", "drone-aerial-video")]
    #[case("Wisuda 2024!", "wisuda-2024")]
    #[case("***", "")]
    fn slugs(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(slugify(name), expected);
    }

    #[test]
    fn media_type_follows_extension() {
        assert_eq!(media_type_for("cover.JPG"), Some(MediaType::Image));
        assert_eq!(media_type_for("teaser.mp4"), Some(MediaType::Video));
        assert_eq!(media_type_for("notes.pdf"), None);
    }

    #[test]
    fn price_must_be_positive() {
        assert!(validate_positive_amount(&Decimal::from(1)).is_ok());
        assert!(validate_positive_amount(&Decimal::ZERO).is_err());
        assert!(validate_positive_amount(&Decimal::from(-5)).is_err());
        assert!(validate_slug("drone-aerial").is_ok());
        assert!(validate_slug("Drone--Aerial").is_err());
    }
}
