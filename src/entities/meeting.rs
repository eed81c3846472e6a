use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Consultation meeting for a validated booking; one per booking
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meetings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub booking_id: Uuid,
    pub admin_id: Uuid,
    pub customer_id: Uuid,
    pub platform: String,
    #[sea_orm(column_type = "Text")]
    pub scheduling_link: String,
    /// Carried through the scheduling link as `utm_content` and echoed back by the webhook
    #[sea_orm(unique)]
    pub correlation_token: String,
    #[sea_orm(nullable)]
    pub client_name: Option<String>,
    #[sea_orm(nullable)]
    pub client_email: Option<String>,
    #[sea_orm(nullable)]
    pub client_phone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub client_notes: Option<String>,
    #[sea_orm(nullable)]
    pub start_time: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub end_time: Option<DateTime<Utc>>,
    pub status: MeetingStatus,
    #[sea_orm(nullable)]
    pub mou_file: Option<String>,
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
        belongs_to = "super::admin::Entity",
        from = "Column::AdminId",
        to = "super::admin::Column::Id"
    )]
    Admin,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admin.def()
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
pub enum MeetingStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl MeetingStatus {
    pub fn can_transition_to(self, next: MeetingStatus) -> bool {
        self == MeetingStatus::Scheduled && next != MeetingStatus::Scheduled
    }
}
