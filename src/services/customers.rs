use crate::{
    entities::{booking, customer, meeting, payment},
    errors::ServiceError,
    services::account::{validate_phone, PrincipalProfile},
    services::{non_blank, page_bounds},
    storage::{FileStore, UploadFolder},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, email or phone
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "must be 2-100 characters"))]
    pub name: Option<String>,
    #[validate(custom = "validate_phone")]
    pub phone: Option<String>,
}

/// Customer administration and self-service profile
#[derive(Clone)]
pub struct CustomerService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStore>,
}

impl CustomerService {
    pub fn new(db: Arc<DatabaseConnection>, files: Arc<FileStore>) -> Self {
        Self { db, files }
    }

    async fn find(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        customer::Entity::find_by_id(customer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: CustomerListQuery,
    ) -> Result<(Vec<PrincipalProfile>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let mut select = customer::Entity::find();

        if let Some(term) = non_blank(query.search) {
            select = select.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(&term))
                    .add(customer::Column::Email.contains(&term))
                    .add(customer::Column::Phone.contains(&term)),
            );
        }

        let paginator = select
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page - 1).await?;

        Ok((customers.into_iter().map(PrincipalProfile::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get_profile(&self, customer_id: Uuid) -> Result<PrincipalProfile, ServiceError> {
        Ok(self.find(customer_id).await?.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_profile(
        &self,
        customer_id: Uuid,
        input: UpdateProfileRequest,
    ) -> Result<PrincipalProfile, ServiceError> {
        input.validate()?;
        let model = self.find(customer_id).await?;

        let mut active: customer::ActiveModel = model.into();
        if let Some(name) = non_blank(input.name) {
            active.name = Set(name);
        }
        if let Some(phone) = non_blank(input.phone) {
            active.phone = Set(phone);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        info!(customer_id = %customer_id, "Profile updated");
        Ok(updated.into())
    }

    /// Stores a new profile photo and removes the one it replaces
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_photo(
        &self,
        customer_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<PrincipalProfile, ServiceError> {
        let model = self.find(customer_id).await?;
        let stored = self
            .files
            .save(UploadFolder::Profiles, original_name, bytes)
            .await?;
        let previous = model.profile_photo.clone();

        let mut active: customer::ActiveModel = model.into();
        active.profile_photo = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now());
        let updated = match active.update(&*self.db).await {
            Ok(updated) => updated,
            Err(e) => {
                self.files
                    .remove_quietly(UploadFolder::Profiles, Some(&stored.filename))
                    .await;
                return Err(e.into());
            }
        };

        self.files
            .remove_quietly(UploadFolder::Profiles, previous.as_deref())
            .await;
        info!(customer_id = %customer_id, file = %stored.filename, "Profile photo replaced");
        Ok(updated.into())
    }

    /// Deletes a customer with their bookings, meetings and payments, then their files.
    #[instrument(skip(self))]
    pub async fn delete(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let model = customer::Entity::find_by_id(customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        let bookings = model.find_related(booking::Entity).all(&txn).await?;
        let booking_ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let payments = payment::Entity::find()
            .filter(payment::Column::CustomerId.eq(customer_id))
            .all(&txn)
            .await?;
        let meetings = meeting::Entity::find()
            .filter(meeting::Column::BookingId.is_in(booking_ids.clone()))
            .all(&txn)
            .await?;

        payment::Entity::delete_many()
            .filter(payment::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;
        meeting::Entity::delete_many()
            .filter(meeting::Column::BookingId.is_in(booking_ids))
            .exec(&txn)
            .await?;
        booking::Entity::delete_many()
            .filter(booking::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;
        let profile_photo = model.profile_photo.clone();
        model.delete(&txn).await?;
        txn.commit().await?;

        let mut files: Vec<(UploadFolder, String)> = Vec::new();
        files.extend(profile_photo.map(|f| (UploadFolder::Profiles, f)));
        files.extend(
            bookings
                .into_iter()
                .filter_map(|b| b.invoice_file)
                .map(|f| (UploadFolder::Invoices, f)),
        );
        files.extend(
            meetings
                .into_iter()
                .filter_map(|m| m.mou_file)
                .map(|f| (UploadFolder::Mou, f)),
        );
        for p in payments {
            files.extend(p.proof_file.map(|f| (UploadFolder::Payments, f)));
            files.extend(p.receipt_file.map(|f| (UploadFolder::Receipts, f)));
        }
        for (folder, file) in &files {
            self.files.remove_quietly(*folder, Some(file)).await;
        }

        info!(customer_id = %customer_id, files_removed = files.len(), "Customer deleted");
        Ok(())
    }
}
