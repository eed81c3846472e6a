use crate::{
    auth::AuthUser,
    entities::{
        booking::{self, BookingStatus},
        customer,
        meeting::{self, MeetingStatus},
        service,
    },
    errors::ServiceError,
    services::{
        account::PrincipalProfile,
        catalog::{validate_positive_amount, ServiceView},
        meetings::MeetingView,
        non_blank, page_bounds,
        payments::{lock_booking, payments_for, Balance, PaymentView},
    },
    storage::{public_url, UploadFolder},
};
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

const CODE_ATTEMPTS: usize = 5;

static EVENT_TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("event time pattern compiles")
});

fn validate_event_time(value: &str) -> Result<(), ValidationError> {
    if EVENT_TIME_PATTERN.is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("event_time");
        err.message = Some("must be HH:MM (24h)".into());
        Err(err)
    }
}

fn random_upper(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// `INV-YYYYMMDD-XXXXXX`
pub fn generate_order_code(today: NaiveDate) -> String {
    format!("INV-{}-{}", today.format("%Y%m%d"), random_upper(6))
}

/// `TRK-XXXXXXXXXX`
pub fn generate_tracking_code() -> String {
    format!("TRK-{}", random_upper(10))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub service_id: Uuid,
    #[validate(length(min = 2, max = 200, message = "must be 2-200 characters"))]
    pub event_name: String,
    #[schema(value_type = String, example = "2026-12-20")]
    pub event_date: NaiveDate,
    #[validate(custom = "validate_event_time")]
    pub event_time: Option<String>,
    #[validate(length(min = 2, max = 300, message = "must be 2-300 characters"))]
    pub event_location: String,
    #[validate(length(max = 5000, message = "must be at most 5000 characters"))]
    pub requirements: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustTotalRequest {
    #[schema(value_type = String, example = "1250000")]
    #[validate(custom = "validate_positive_amount")]
    pub total_tagihan: Decimal,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<BookingStatus>,
    /// Matches order code, tracking code or event name
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    pub order_code: String,
    pub tracking_code: String,
    pub event_name: String,
    #[schema(value_type = String)]
    pub event_date: NaiveDate,
    pub event_time: Option<String>,
    pub event_location: String,
    pub requirements: Option<String>,
    #[schema(value_type = String)]
    pub total_tagihan: Decimal,
    pub status: BookingStatus,
    pub invoice_file: Option<String>,
    pub invoice_url: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<booking::Model> for BookingView {
    fn from(model: booking::Model) -> Self {
        let invoice_url = model
            .invoice_file
            .as_deref()
            .map(|f| public_url(UploadFolder::Invoices, f));
        Self {
            id: model.id,
            customer_id: model.customer_id,
            service_id: model.service_id,
            order_code: model.order_code,
            tracking_code: model.tracking_code,
            event_name: model.event_name,
            event_date: model.event_date,
            event_time: model.event_time,
            event_location: model.event_location,
            requirements: model.requirements,
            total_tagihan: model.total_tagihan,
            status: model.status,
            invoice_file: model.invoice_file,
            invoice_url,
            admin_notes: model.admin_notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Booking with everything hanging off it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookingDetail {
    pub booking: BookingView,
    pub service: Option<ServiceView>,
    pub customer: Option<PrincipalProfile>,
    pub meeting: Option<MeetingView>,
    pub payments: Vec<PaymentView>,
    pub balance: Balance,
}

/// Public tracking projection; carries no customer data
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingView {
    pub order_code: String,
    pub tracking_code: String,
    pub service_name: String,
    pub event_name: String,
    #[schema(value_type = String)]
    pub event_date: NaiveDate,
    pub status: BookingStatus,
    pub meeting_status: Option<MeetingStatus>,
    #[schema(value_type = String)]
    pub total_tagihan: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
    #[schema(value_type = String)]
    pub remaining: Decimal,
}

/// Bookings ("pemesanan") and their validation workflow
#[derive(Clone)]
pub struct BookingService {
    db: Arc<DatabaseConnection>,
}

impl BookingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn codes_are_free(
        &self,
        order_code: &str,
        tracking_code: &str,
    ) -> Result<bool, ServiceError> {
        let clash = booking::Entity::find()
            .filter(
                Condition::any()
                    .add(booking::Column::OrderCode.eq(order_code))
                    .add(booking::Column::TrackingCode.eq(tracking_code)),
            )
            .count(&*self.db)
            .await?;
        Ok(clash == 0)
    }

    /// Books an active service; the total is copied from the service's starting price.
    #[instrument(skip(self, input), fields(service_id = %input.service_id))]
    pub async fn create(
        &self,
        customer_id: Uuid,
        input: CreateBookingRequest,
    ) -> Result<BookingView, ServiceError> {
        input.validate()?;
        let today = Utc::now().date_naive();
        if input.event_date < today {
            return Err(ServiceError::ValidationError(
                "event_date cannot be in the past".to_string(),
            ));
        }

        let offering = service::Entity::find_by_id(input.service_id)
            .one(&*self.db)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Service {} not found", input.service_id))
            })?;

        for attempt in 1..=CODE_ATTEMPTS {
            let order_code = generate_order_code(today);
            let tracking_code = generate_tracking_code();
            if !self.codes_are_free(&order_code, &tracking_code).await? {
                warn!(attempt, "Booking code collision, regenerating");
                continue;
            }

            let now = Utc::now();
            let inserted = booking::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id),
                service_id: Set(offering.id),
                order_code: Set(order_code),
                tracking_code: Set(tracking_code),
                event_name: Set(input.event_name.trim().to_string()),
                event_date: Set(input.event_date),
                event_time: Set(non_blank(input.event_time.clone())),
                event_location: Set(input.event_location.trim().to_string()),
                requirements: Set(non_blank(input.requirements.clone())),
                total_tagihan: Set(offering.price_from),
                status: Set(BookingStatus::AwaitingValidation),
                invoice_file: Set(None),
                admin_notes: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&*self.db)
            .await;

            match inserted {
                Ok(model) => {
                    counter!("bookings_created_total", 1);
                    info!(
                        booking_id = %model.id,
                        order_code = %model.order_code,
                        total_tagihan = %model.total_tagihan,
                        "Booking created"
                    );
                    return Ok(model.into());
                }
                Err(e) => match ServiceError::from_db_conflict(e, "code collision") {
                    ServiceError::Conflict(_) => {
                        warn!(attempt, "Booking code collision on insert, regenerating");
                    }
                    other => return Err(other),
                },
            }
        }

        Err(ServiceError::InternalError(
            "Could not allocate unique booking codes".to_string(),
        ))
    }

    /// Bookings of one customer, or all bookings when `customer_id` is `None`.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: BookingListQuery,
        customer_id: Option<Uuid>,
    ) -> Result<(Vec<BookingView>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let mut select = booking::Entity::find();
        if let Some(customer_id) = customer_id {
            select = select.filter(booking::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = query.status {
            select = select.filter(booking::Column::Status.eq(status));
        }
        if let Some(term) = non_blank(query.search) {
            select = select.filter(
                Condition::any()
                    .add(booking::Column::OrderCode.contains(&term))
                    .add(booking::Column::TrackingCode.contains(&term))
                    .add(booking::Column::EventName.contains(&term)),
            );
        }

        let paginator = select
            .order_by_desc(booking::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let bookings = paginator.fetch_page(page - 1).await?;
        Ok((bookings.into_iter().map(BookingView::from).collect(), total))
    }

    /// Owner or admin view of a booking with its service, meeting and payments
    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn get(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<BookingDetail, ServiceError> {
        let db = &*self.db;
        let model = booking::Entity::find_by_id(booking_id)
            .one(db)
            .await?
            .filter(|b| user.is_admin() || b.customer_id == user.id)
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        let offering = service::Entity::find_by_id(model.service_id).one(db).await?;
        let customer = if user.is_admin() {
            customer::Entity::find_by_id(model.customer_id)
                .one(db)
                .await?
                .map(PrincipalProfile::from)
        } else {
            None
        };
        let meeting = meeting::Entity::find()
            .filter(meeting::Column::BookingId.eq(model.id))
            .one(db)
            .await?;
        let payments = payments_for(db, model.id).await?;
        let balance = Balance::of(model.total_tagihan, &payments);

        Ok(BookingDetail {
            booking: model.into(),
            service: offering.map(ServiceView::from),
            customer,
            meeting: meeting.map(MeetingView::from),
            payments: payments.into_iter().map(PaymentView::from).collect(),
            balance,
        })
    }

    /// Admin transition out of `awaiting_validation`
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        input: UpdateBookingStatusRequest,
    ) -> Result<BookingView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let model = lock_booking(&txn, booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        if !model.status.can_transition_to(input.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Booking cannot move from {} to {}",
                model.status, input.status
            )));
        }

        let previous = model.status;
        let mut active: booking::ActiveModel = model.into();
        active.status = Set(input.status);
        if let Some(notes) = non_blank(input.admin_notes) {
            active.admin_notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        counter!("booking_status_changes_total", 1, "status" => updated.status.to_string());
        info!(
            booking_id = %booking_id,
            from = %previous,
            to = %updated.status,
            "Booking status updated"
        );
        Ok(updated.into())
    }

    /// Admin correction of the amount due, allowed until a payment holds balance.
    #[instrument(skip(self, input), fields(total_tagihan = %input.total_tagihan))]
    pub async fn adjust_total(
        &self,
        booking_id: Uuid,
        input: AdjustTotalRequest,
    ) -> Result<BookingView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let model = lock_booking(&txn, booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;
        if model.status == BookingStatus::Cancelled {
            return Err(ServiceError::InvalidStatus(
                "A cancelled booking cannot be re-priced".to_string(),
            ));
        }

        // tier amounts are fractions of the total, so it is frozen once a payment holds balance
        let payments = payments_for(&txn, booking_id).await?;
        let balance = Balance::of(model.total_tagihan, &payments);
        if payments.iter().any(|p| p.status.holds_balance()) {
            warn!(
                booking_id = %booking_id,
                held = %(balance.paid + balance.pending),
                "Total adjustment rejected"
            );
            return Err(ServiceError::InvalidOperation(format!(
                "Total cannot be changed while payments hold {} of it",
                balance.paid + balance.pending
            )));
        }

        let mut active: booking::ActiveModel = model.into();
        active.total_tagihan = Set(input.total_tagihan);
        if let Some(notes) = non_blank(input.admin_notes) {
            active.admin_notes = Set(Some(notes));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(booking_id = %booking_id, "Booking total adjusted");
        Ok(updated.into())
    }

    /// Public lookup by tracking code (order codes are accepted too)
    #[instrument(skip(self))]
    pub async fn track(&self, code: &str) -> Result<TrackingView, ServiceError> {
        let db = &*self.db;
        let code = code.trim().to_ascii_uppercase();
        let model = booking::Entity::find()
            .filter(
                Condition::any()
                    .add(booking::Column::TrackingCode.eq(code.as_str()))
                    .add(booking::Column::OrderCode.eq(code.as_str())),
            )
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("No booking found for {}", code)))?;

        let service_name = service::Entity::find_by_id(model.service_id)
            .one(db)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();
        let meeting_status = meeting::Entity::find()
            .filter(meeting::Column::BookingId.eq(model.id))
            .one(db)
            .await?
            .map(|m| m.status);
        let payments = payments_for(db, model.id).await?;
        let balance = Balance::of(model.total_tagihan, &payments);

        Ok(TrackingView {
            order_code: model.order_code,
            tracking_code: model.tracking_code,
            service_name,
            event_name: model.event_name,
            event_date: model.event_date,
            status: model.status,
            meeting_status,
            total_tagihan: model.total_tagihan,
            paid: balance.paid,
            remaining: balance.remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_formats() {
        let order = generate_order_code(NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());
        assert!(order.starts_with("INV-20260309-"));
        let suffix = order.trim_start_matches("INV-20260309-");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        let tracking = generate_tracking_code();
        assert_eq!(tracking.len(), 14);
        assert!(tracking[4..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn event_time_is_24h() {
        assert!(validate_event_time("09:30").is_ok());
        assert!(validate_event_time("23:59").is_ok());
        assert!(validate_event_time("24:00").is_err());
        assert!(validate_event_time("9:30").is_err());
    }
}
