use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Customer order against a catalog offering ("pemesanan")
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub service_id: Uuid,
    #[sea_orm(unique)]
    pub order_code: String,
    #[sea_orm(unique)]
    pub tracking_code: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    #[sea_orm(nullable)]
    pub event_time: Option<String>,
    pub event_location: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub requirements: Option<String>,
    pub total_tagihan: Decimal,
    pub status: BookingStatus,
    #[sea_orm(nullable)]
    pub invoice_file: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Cascade"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id"
    )]
    Service,
    #[sea_orm(has_one = "super::meeting::Entity")]
    Meeting,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::meeting::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Meeting.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum BookingStatus {
    #[sea_orm(string_value = "awaiting_validation")]
    AwaitingValidation,
    #[sea_orm(string_value = "validated")]
    Validated,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    /// Only a booking awaiting validation may move, and only forward.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::AwaitingValidation, BookingStatus::Validated)
                | (BookingStatus::AwaitingValidation, BookingStatus::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::BookingStatus::*;

    #[test]
    fn transitions_leave_awaiting_validation_only() {
        assert!(AwaitingValidation.can_transition_to(Validated));
        assert!(AwaitingValidation.can_transition_to(Cancelled));
        assert!(!Validated.can_transition_to(Cancelled));
        assert!(!Validated.can_transition_to(AwaitingValidation));
        assert!(!Cancelled.can_transition_to(Validated));
        assert!(!AwaitingValidation.can_transition_to(AwaitingValidation));
    }
}
