use crate::{
    auth::AuthUser,
    db::supports_row_locks,
    entities::{
        booking::{self, BookingStatus},
        payment::{self, PaymentStatus, PaymentType},
    },
    errors::ServiceError,
    services::{catalog::validate_positive_amount, non_blank, page_bounds},
    storage::{public_url, FileStore, UploadFolder},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Money position of a booking derived from its payments.
///
/// `remaining` subtracts every balance-holding payment (pending, cicilan, lunas);
/// `paid` only counts verified ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Balance {
    #[schema(value_type = String)]
    pub total: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    #[schema(value_type = String)]
    pub pending: Decimal,
    #[schema(value_type = String)]
    pub remaining: Decimal,
}

impl Balance {
    pub fn of(total: Decimal, payments: &[payment::Model]) -> Self {
        let mut paid = Decimal::ZERO;
        let mut pending = Decimal::ZERO;
        for p in payments {
            match p.status {
                PaymentStatus::Lunas | PaymentStatus::Cicilan => paid += p.amount,
                PaymentStatus::Pending => pending += p.amount,
                PaymentStatus::Gagal => {}
            }
        }
        Self {
            total,
            paid,
            pending,
            remaining: total - paid - pending,
        }
    }
}

/// Tiers a booking may take next given its balance-holding payments.
pub fn allowed_next_tiers(held: &[&payment::Model]) -> Vec<PaymentType> {
    if held.is_empty() {
        return vec![PaymentType::Dp, PaymentType::Full];
    }
    let has = |t: PaymentType| held.iter().any(|p| p.payment_type == t);
    if has(PaymentType::Dp) && !has(PaymentType::Pelunasan) && !has(PaymentType::Full) {
        vec![PaymentType::Pelunasan]
    } else {
        Vec::new()
    }
}

pub(crate) fn type_label(payment_type: PaymentType) -> &'static str {
    match payment_type {
        PaymentType::Dp => "DP",
        PaymentType::Pelunasan => "Pelunasan",
        PaymentType::Full => "Full payment",
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    pub booking_id: Uuid,
    pub payment_type: PaymentType,
    #[schema(value_type = String, example = "250000")]
    #[validate(custom = "validate_positive_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 50, message = "must be 1-50 characters"))]
    pub method: String,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    pub status: PaymentStatus,
    #[validate(length(max = 1000, message = "must be at most 1000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaymentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<PaymentStatus>,
    pub booking_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentView {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub admin_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub sequence: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[schema(value_type = String)]
    pub sisa_tagihan: Decimal,
    pub percentage: i32,
    pub method: String,
    pub proof_file: Option<String>,
    pub proof_url: Option<String>,
    pub status: PaymentStatus,
    pub diverifikasi: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub receipt_file: Option<String>,
    pub receipt_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<payment::Model> for PaymentView {
    fn from(model: payment::Model) -> Self {
        let proof_url = model
            .proof_file
            .as_deref()
            .map(|f| public_url(UploadFolder::Payments, f));
        let receipt_url = model
            .receipt_file
            .as_deref()
            .map(|f| public_url(UploadFolder::Receipts, f));
        Self {
            id: model.id,
            booking_id: model.booking_id,
            customer_id: model.customer_id,
            admin_id: model.admin_id,
            payment_type: model.payment_type,
            sequence: model.sequence,
            amount: model.amount,
            sisa_tagihan: model.sisa_tagihan,
            percentage: model.percentage,
            method: model.method,
            proof_file: model.proof_file,
            proof_url,
            status: model.status,
            diverifikasi: model.diverifikasi,
            verified_at: model.verified_at,
            receipt_file: model.receipt_file,
            receipt_url,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierOption {
    pub payment_type: PaymentType,
    pub percentage: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentSummary {
    pub booking_id: Uuid,
    pub order_code: String,
    pub booking_status: BookingStatus,
    pub balance: Balance,
    pub next_allowed: Vec<TierOption>,
    pub payments: Vec<PaymentView>,
}

/// Loads a booking inside a transaction, locking its row where the backend supports it.
pub(crate) async fn lock_booking<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<Option<booking::Model>, ServiceError> {
    let mut query = booking::Entity::find_by_id(booking_id);
    if supports_row_locks(conn) {
        query = query.lock_exclusive();
    }
    Ok(query.one(conn).await?)
}

pub(crate) async fn payments_for<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<Vec<payment::Model>, ServiceError> {
    Ok(payment::Entity::find()
        .filter(payment::Column::BookingId.eq(booking_id))
        .order_by_asc(payment::Column::Sequence)
        .order_by_asc(payment::Column::CreatedAt)
        .all(conn)
        .await?)
}

/// Tiered payments ("pembayaran") against validated bookings
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStore>,
}

impl PaymentService {
    pub fn new(db: Arc<DatabaseConnection>, files: Arc<FileStore>) -> Self {
        Self { db, files }
    }

    /// Accepts a payment after checking ownership, booking state, the exact tier
    /// amount, the remaining balance and tier ordering, all in one transaction.
    #[instrument(
        skip(self, input),
        fields(booking_id = %input.booking_id, payment_type = %input.payment_type)
    )]
    pub async fn create(
        &self,
        customer_id: Uuid,
        input: CreatePaymentRequest,
    ) -> Result<PaymentView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;

        let booking = lock_booking(&txn, input.booking_id)
            .await?
            .filter(|b| b.customer_id == customer_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Booking {} not found", input.booking_id))
            })?;
        if booking.status != BookingStatus::Validated {
            return Err(ServiceError::InvalidStatus(format!(
                "Booking {} is {}; payments require a validated booking",
                booking.order_code, booking.status
            )));
        }

        let existing = payments_for(&txn, booking.id).await?;
        let balance = Balance::of(booking.total_tagihan, &existing);
        let held: Vec<&payment::Model> =
            existing.iter().filter(|p| p.status.holds_balance()).collect();

        if balance.remaining <= Decimal::ZERO {
            return Err(ServiceError::InvalidOperation(format!(
                "Booking is already fully paid (remaining balance {})",
                balance.remaining.max(Decimal::ZERO)
            )));
        }

        let expected = input.payment_type.expected_amount(booking.total_tagihan);
        if input.amount != expected {
            return Err(ServiceError::ValidationError(format!(
                "Amount for {} must be exactly {} ({}% of {})",
                input.payment_type,
                expected,
                input.payment_type.percentage(),
                booking.total_tagihan
            )));
        }

        if input.amount > balance.remaining {
            return Err(ServiceError::InvalidOperation(format!(
                "Amount {} exceeds the remaining balance {}",
                input.amount, balance.remaining
            )));
        }

        let allowed = allowed_next_tiers(&held);
        if !allowed.contains(&input.payment_type) {
            let message = match input.payment_type {
                PaymentType::Pelunasan => "A pelunasan payment requires a prior dp payment",
                PaymentType::Dp | PaymentType::Full => {
                    "dp and full payments are only accepted as the first payment"
                }
            };
            return Err(ServiceError::InvalidOperation(message.to_string()));
        }

        let now = Utc::now();
        let model = payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking.id),
            customer_id: Set(customer_id),
            admin_id: Set(None),
            payment_type: Set(input.payment_type),
            sequence: Set(held.len() as i32 + 1),
            amount: Set(input.amount),
            sisa_tagihan: Set(balance.remaining - input.amount),
            percentage: Set(input.payment_type.percentage()),
            method: Set(input.method.trim().to_string()),
            proof_file: Set(None),
            status: Set(PaymentStatus::Pending),
            diverifikasi: Set(false),
            verified_at: Set(None),
            receipt_file: Set(None),
            notes: Set(non_blank(input.notes)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        counter!("payments_created_total", 1, "type" => model.payment_type.to_string());
        info!(
            payment_id = %model.id,
            sequence = model.sequence,
            amount = %model.amount,
            sisa_tagihan = %model.sisa_tagihan,
            "Payment recorded"
        );
        Ok(model.into())
    }

    /// Attaches (or replaces) the transfer proof of the caller's own payment
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_proof(
        &self,
        customer_id: Uuid,
        payment_id: Uuid,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<PaymentView, ServiceError> {
        let model = payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .filter(|p| p.customer_id == customer_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;
        if model.status == PaymentStatus::Lunas {
            return Err(ServiceError::InvalidStatus(
                "Proof cannot be replaced on a settled payment".to_string(),
            ));
        }

        let stored = self
            .files
            .save(UploadFolder::Payments, original_name, bytes)
            .await?;
        let previous = model.proof_file.clone();
        let mut active: payment::ActiveModel = model.into();
        active.proof_file = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now());
        let updated = match active.update(&*self.db).await {
            Ok(updated) => updated,
            Err(e) => {
                self.files
                    .remove_quietly(UploadFolder::Payments, Some(&stored.filename))
                    .await;
                return Err(e.into());
            }
        };

        self.files
            .remove_quietly(UploadFolder::Payments, previous.as_deref())
            .await;
        info!(payment_id = %payment_id, file = %stored.filename, "Payment proof stored");
        Ok(updated.into())
    }

    /// Admin decision on a payment. Re-activating a failed payment re-checks tier order
    /// and balance; a dp cannot fail underneath a held pelunasan.
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn verify(
        &self,
        admin_id: Uuid,
        payment_id: Uuid,
        input: VerifyPaymentRequest,
    ) -> Result<PaymentView, ServiceError> {
        input.validate()?;
        if input.status == PaymentStatus::Pending {
            return Err(ServiceError::ValidationError(
                "Verification must set lunas, cicilan or gagal".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let model = payment::Entity::find_by_id(payment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;
        let booking = lock_booking(&txn, model.booking_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Booking {} not found", model.booking_id))
        })?;

        let others: Vec<payment::Model> = payments_for(&txn, booking.id)
            .await?
            .into_iter()
            .filter(|p| p.id != model.id)
            .collect();
        let others_held: Vec<&payment::Model> =
            others.iter().filter(|p| p.status.holds_balance()).collect();

        if model.status.holds_balance() && !input.status.holds_balance() {
            let dependent = model.payment_type == PaymentType::Dp
                && others_held
                    .iter()
                    .any(|p| p.payment_type == PaymentType::Pelunasan);
            if dependent {
                warn!(payment_id = %payment_id, "Failing a dp with a held pelunasan rejected");
                return Err(ServiceError::InvalidOperation(
                    "A dp cannot fail while a pelunasan that follows it is still held".to_string(),
                ));
            }
        }

        if !model.status.holds_balance() && input.status.holds_balance() {
            if !allowed_next_tiers(&others_held).contains(&model.payment_type) {
                return Err(ServiceError::InvalidOperation(format!(
                    "A {} payment cannot be reactivated alongside the payments already held",
                    model.payment_type
                )));
            }
            let balance = Balance::of(booking.total_tagihan, &others);
            if model.amount > balance.remaining {
                warn!(
                    payment_id = %payment_id,
                    remaining = %balance.remaining,
                    "Reactivation rejected"
                );
                return Err(ServiceError::InvalidOperation(format!(
                    "Reactivating this payment would exceed the remaining balance {}",
                    balance.remaining
                )));
            }
        }

        let now = Utc::now();
        let mut active: payment::ActiveModel = model.into();
        active.status = Set(input.status);
        active.diverifikasi = Set(input.status != PaymentStatus::Gagal);
        active.admin_id = Set(Some(admin_id));
        active.verified_at = Set(Some(now));
        if let Some(notes) = non_blank(input.notes) {
            active.notes = Set(Some(notes));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("payments_verified_total", 1, "status" => updated.status.to_string());
        info!(payment_id = %payment_id, booking_id = %updated.booking_id, "Payment verified");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: PaymentListQuery,
        customer_id: Option<Uuid>,
    ) -> Result<(Vec<PaymentView>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let mut select = payment::Entity::find();
        if let Some(customer_id) = customer_id {
            select = select.filter(payment::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = query.status {
            select = select.filter(payment::Column::Status.eq(status));
        }
        if let Some(booking_id) = query.booking_id {
            select = select.filter(payment::Column::BookingId.eq(booking_id));
        }

        let paginator = select
            .order_by_desc(payment::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let payments = paginator.fetch_page(page - 1).await?;
        Ok((payments.into_iter().map(PaymentView::from).collect(), total))
    }

    /// A payment visible to the caller: admins see all, customers their own.
    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn get(
        &self,
        user: &AuthUser,
        payment_id: Uuid,
    ) -> Result<PaymentView, ServiceError> {
        payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .filter(|p| user.is_admin() || p.customer_id == user.id)
            .map(PaymentView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))
    }

    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn summary(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<PaymentSummary, ServiceError> {
        let booking = booking::Entity::find_by_id(booking_id)
            .one(&*self.db)
            .await?
            .filter(|b| user.is_admin() || b.customer_id == user.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        let payments = payments_for(&*self.db, booking.id).await?;
        let balance = Balance::of(booking.total_tagihan, &payments);
        let held: Vec<&payment::Model> =
            payments.iter().filter(|p| p.status.holds_balance()).collect();

        let next_allowed = if booking.status == BookingStatus::Validated
            && balance.remaining > Decimal::ZERO
        {
            allowed_next_tiers(&held)
                .into_iter()
                .map(|t| TierOption {
                    payment_type: t,
                    percentage: t.percentage(),
                    amount: t.expected_amount(booking.total_tagihan),
                })
                .filter(|o| o.amount <= balance.remaining)
                .collect()
        } else {
            Vec::new()
        };

        Ok(PaymentSummary {
            booking_id: booking.id,
            order_code: booking.order_code,
            booking_status: booking.status,
            balance,
            next_allowed,
            payments: payments.into_iter().map(PaymentView::from).collect(),
        })
    }
}
