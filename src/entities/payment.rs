use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tiered payment against a booking ("pembayaran")
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    /// Admin who last verified the payment
    #[sea_orm(nullable)]
    pub admin_id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub sequence: i32,
    pub amount: Decimal,
    /// Remaining balance right after this payment was accepted
    pub sisa_tagihan: Decimal,
    pub percentage: i32,
    pub method: String,
    #[sea_orm(nullable)]
    pub proof_file: Option<String>,
    pub status: PaymentStatus,
    pub diverifikasi: bool,
    #[sea_orm(nullable)]
    pub verified_at: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub receipt_file: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id",
        on_delete = "Cascade"
    )]
    Booking,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "Cascade"
    )]
    Customer,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
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
pub enum PaymentType {
    /// Down payment, 25%
    #[sea_orm(string_value = "dp")]
    Dp,
    /// Settlement, 75%
    #[sea_orm(string_value = "pelunasan")]
    Pelunasan,
    #[sea_orm(string_value = "full")]
    Full,
}

impl PaymentType {
    pub fn percentage(self) -> i32 {
        match self {
            PaymentType::Dp => 25,
            PaymentType::Pelunasan => 75,
            PaymentType::Full => 100,
        }
    }

    /// Exact amount this tier must carry for a booking total.
    pub fn expected_amount(self, total: Decimal) -> Decimal {
        (total * Decimal::from(self.percentage()) / Decimal::from(100))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

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
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "lunas")]
    Lunas,
    #[sea_orm(string_value = "cicilan")]
    Cicilan,
    #[sea_orm(string_value = "gagal")]
    Gagal,
}

impl PaymentStatus {
    /// Whether a payment in this status counts against the booking's remaining balance.
    pub fn holds_balance(self) -> bool {
        !matches!(self, PaymentStatus::Gagal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tier_amounts() {
        let total = dec!(1000000);
        assert_eq!(PaymentType::Dp.expected_amount(total), dec!(250000));
        assert_eq!(PaymentType::Pelunasan.expected_amount(total), dec!(750000));
        assert_eq!(PaymentType::Full.expected_amount(total), total);
        assert_eq!(PaymentType::Dp.expected_amount(dec!(1500000.50)), dec!(375000.13));
    }

    #[test]
    fn failed_payments_release_balance() {
        assert!(PaymentStatus::Pending.holds_balance());
        assert!(PaymentStatus::Cicilan.holds_balance());
        assert!(PaymentStatus::Lunas.holds_balance());
        assert!(!PaymentStatus::Gagal.holds_balance());
    }
}
