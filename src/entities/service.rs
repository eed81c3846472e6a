use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Catalog offering ("layanan")
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub category: ServiceCategory,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Starting price; copied onto a booking as its total when booked
    pub price_from: Decimal,
    pub turnaround: String,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_media::Entity")]
    Media,
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
}

impl Related<super::service_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
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
pub enum ServiceCategory {
    #[sea_orm(string_value = "prewedding")]
    Prewedding,
    #[sea_orm(string_value = "drone")]
    Drone,
    #[sea_orm(string_value = "graduation")]
    Graduation,
    #[sea_orm(string_value = "corporate_event")]
    CorporateEvent,
    #[sea_orm(string_value = "documentary")]
    Documentary,
}
