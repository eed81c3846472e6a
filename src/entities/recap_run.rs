use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted aggregates of one report generation ("rekap")
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recap_runs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub admin_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub run_day: i32,
    pub run_month: i32,
    pub run_year: i32,
    pub total_bookings: i32,
    pub bookings_awaiting: i32,
    pub bookings_validated: i32,
    pub bookings_cancelled: i32,
    pub total_meetings: i32,
    pub meetings_scheduled: i32,
    pub meetings_completed: i32,
    pub meetings_cancelled: i32,
    pub total_payments: i32,
    pub payments_verified: i32,
    pub sum_dp: Decimal,
    pub sum_pelunasan: Decimal,
    pub sum_full: Decimal,
    pub sum_lunas: Decimal,
    pub report_file: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::admin::Entity",
        from = "Column::AdminId",
        to = "super::admin::Column::Id"
    )]
    Admin,
}

impl Related<super::admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
