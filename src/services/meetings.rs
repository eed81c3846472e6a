use crate::{
    auth::AuthUser,
    config::AppConfig,
    entities::{
        booking::BookingStatus,
        customer,
        meeting::{self, MeetingStatus},
    },
    errors::ServiceError,
    services::{non_blank, page_bounds, payments::lock_booking},
    storage::{public_url, UploadFolder},
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use metrics::counter;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const SIGNATURE_HEADER: &str = "calendly-webhook-signature";
const UTM_PARAM: &str = "utm_content";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct MeetingSettings {
    pub scheduling_link: String,
    pub webhook_secret: Option<String>,
    pub webhook_tolerance_secs: i64,
}

impl From<&AppConfig> for MeetingSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            scheduling_link: cfg.scheduling_link.clone(),
            webhook_secret: cfg
                .scheduling_webhook_secret
                .clone()
                .filter(|s| !s.is_empty()),
            webhook_tolerance_secs: cfg.scheduling_webhook_tolerance_secs as i64,
        }
    }
}

/// Random 32-character hex token
fn correlation_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Appends `utm_content=<token>` to a link, keeping any fragment last.
pub fn with_correlation_token(link: &str, token: &str) -> String {
    let (base, fragment) = match link.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (link, None),
    };
    let separator = if base.contains('?') {
        if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };
    let mut out = format!("{}{}{}={}", base, separator, UTM_PARAM, token);
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Checks a `t=<unix>,v1=<hex>` signature header over `"<t>.<body>"`.
pub fn verify_signature(
    secret: &str,
    header: Option<&str>,
    body: &[u8],
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<(), ServiceError> {
    let invalid = |reason: &str| ServiceError::Unauthorized(format!("Invalid webhook signature: {}", reason));
    let header = header.ok_or_else(|| invalid("missing header"))?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or_else(|| invalid("missing timestamp"))?;
    if (now.timestamp() - timestamp).abs() > tolerance_secs {
        return Err(invalid("timestamp outside tolerance"));
    }

    for signature in signatures {
        let Ok(expected) = hex::decode(signature) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(body);
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }
    Err(invalid("no matching signature"))
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMeetingRequest {
    pub booking_id: Uuid,
    #[validate(length(min = 2, max = 50, message = "must be 2-50 characters"))]
    pub platform: String,
    /// Defaults to the configured scheduling link
    #[validate(url(message = "must be a valid URL"))]
    pub scheduling_link: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub client_notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMeetingRequest {
    #[validate(length(min = 2, max = 50, message = "must be 2-50 characters"))]
    pub platform: Option<String>,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub client_name: Option<String>,
    #[validate(email(message = "must be a valid email address"))]
    pub client_email: Option<String>,
    #[validate(length(max = 30, message = "must be at most 30 characters"))]
    pub client_phone: Option<String>,
    #[validate(length(max = 2000, message = "must be at most 2000 characters"))]
    pub client_notes: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateMeetingStatusRequest {
    pub status: MeetingStatus,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MeetingListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub status: Option<MeetingStatus>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeetingView {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub admin_id: Uuid,
    pub customer_id: Uuid,
    pub platform: String,
    pub scheduling_link: String,
    pub correlation_token: String,
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_notes: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: MeetingStatus,
    pub mou_file: Option<String>,
    pub mou_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<meeting::Model> for MeetingView {
    fn from(model: meeting::Model) -> Self {
        let mou_url = model
            .mou_file
            .as_deref()
            .map(|f| public_url(UploadFolder::Mou, f));
        Self {
            id: model.id,
            booking_id: model.booking_id,
            admin_id: model.admin_id,
            customer_id: model.customer_id,
            platform: model.platform,
            scheduling_link: model.scheduling_link,
            correlation_token: model.correlation_token,
            client_name: model.client_name,
            client_email: model.client_email,
            client_phone: model.client_phone,
            client_notes: model.client_notes,
            start_time: model.start_time,
            end_time: model.end_time,
            status: model.status,
            mou_file: model.mou_file,
            mou_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Scheduling provider notification. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SchedulingWebhook {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct WebhookPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub text_reminder_number: Option<String>,
    pub questions_and_answers: Vec<QuestionAnswer>,
    pub scheduled_event: Option<ScheduledEvent>,
    pub tracking: Option<WebhookTracking>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ScheduledEvent {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct WebhookTracking {
    pub utm_content: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookOutcome {
    pub event: String,
    pub matched: bool,
    pub meeting_id: Option<Uuid>,
}

impl WebhookPayload {
    /// Phone from the reminder number, else from a phone-like question
    fn phone(&self) -> Option<String> {
        non_blank(self.text_reminder_number.clone()).or_else(|| {
            self.questions_and_answers
                .iter()
                .find(|qa| {
                    let q = qa.question.to_lowercase();
                    q.contains("phone") || q.contains("telepon") || q.contains("whatsapp")
                })
                .and_then(|qa| non_blank(Some(qa.answer.clone())))
        })
    }

    fn notes(&self) -> Option<String> {
        let lines: Vec<String> = self
            .questions_and_answers
            .iter()
            .filter(|qa| !qa.answer.trim().is_empty())
            .map(|qa| format!("{}: {}", qa.question.trim(), qa.answer.trim()))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

fn check_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ServiceError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ServiceError::ValidationError(
            "end_time must not be before start_time".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Consultation meetings for validated bookings
#[derive(Clone)]
pub struct MeetingService {
    db: Arc<DatabaseConnection>,
    settings: MeetingSettings,
}

impl MeetingService {
    pub fn new(db: Arc<DatabaseConnection>, settings: MeetingSettings) -> Self {
        Self { db, settings }
    }

    pub fn settings(&self) -> &MeetingSettings {
        &self.settings
    }

    async fn find(&self, meeting_id: Uuid) -> Result<meeting::Model, ServiceError> {
        meeting::Entity::find_by_id(meeting_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Meeting {} not found", meeting_id)))
    }

    /// Schedules the one meeting a validated booking may have. The existence check runs
    /// in the same transaction as the insert and the unique index on `booking_id` backs it.
    #[instrument(skip(self, input), fields(booking_id = %input.booking_id))]
    pub async fn create(
        &self,
        admin_id: Uuid,
        input: CreateMeetingRequest,
    ) -> Result<MeetingView, ServiceError> {
        input.validate()?;
        check_window(input.start_time, input.end_time)?;
        const DUPLICATE: &str = "Meeting already exists for this booking";

        let txn = self.db.begin().await?;
        let booking = lock_booking(&txn, input.booking_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Booking {} not found", input.booking_id))
        })?;
        if booking.status != BookingStatus::Validated {
            return Err(ServiceError::InvalidStatus(format!(
                "Booking {} is {}; meetings require a validated booking",
                booking.order_code, booking.status
            )));
        }

        let existing = meeting::Entity::find()
            .filter(meeting::Column::BookingId.eq(booking.id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(DUPLICATE.to_string()));
        }

        let client = customer::Entity::find_by_id(booking.customer_id)
            .one(&txn)
            .await?;
        let token = correlation_token();
        let base_link = non_blank(input.scheduling_link)
            .unwrap_or_else(|| self.settings.scheduling_link.clone());

        let now = Utc::now();
        let model = meeting::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking.id),
            admin_id: Set(admin_id),
            customer_id: Set(booking.customer_id),
            platform: Set(input.platform.trim().to_string()),
            scheduling_link: Set(with_correlation_token(&base_link, &token)),
            correlation_token: Set(token),
            client_name: Set(client.as_ref().map(|c| c.name.clone())),
            client_email: Set(client.as_ref().map(|c| c.email.clone())),
            client_phone: Set(client.as_ref().map(|c| c.phone.clone())),
            client_notes: Set(non_blank(input.client_notes)),
            start_time: Set(input.start_time),
            end_time: Set(input.end_time),
            status: Set(MeetingStatus::Scheduled),
            mou_file: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_db_conflict(e, DUPLICATE))?;
        txn.commit().await?;

        counter!("meetings_created_total", 1);
        info!(meeting_id = %model.id, "Meeting scheduled");
        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: MeetingListQuery,
        customer_id: Option<Uuid>,
    ) -> Result<(Vec<MeetingView>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let mut select = meeting::Entity::find();
        if let Some(customer_id) = customer_id {
            select = select.filter(meeting::Column::CustomerId.eq(customer_id));
        }
        if let Some(status) = query.status {
            select = select.filter(meeting::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(meeting::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let meetings = paginator.fetch_page(page - 1).await?;
        Ok((meetings.into_iter().map(MeetingView::from).collect(), total))
    }

    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn get(&self, user: &AuthUser, meeting_id: Uuid) -> Result<MeetingView, ServiceError> {
        let model = self.find(meeting_id).await?;
        if !user.is_admin() && model.customer_id != user.id {
            return Err(ServiceError::NotFound(format!(
                "Meeting {} not found",
                meeting_id
            )));
        }
        Ok(model.into())
    }

    #[instrument(skip(self, user), fields(principal_id = %user.id))]
    pub async fn get_by_booking(
        &self,
        user: &AuthUser,
        booking_id: Uuid,
    ) -> Result<MeetingView, ServiceError> {
        meeting::Entity::find()
            .filter(meeting::Column::BookingId.eq(booking_id))
            .one(&*self.db)
            .await?
            .filter(|m| user.is_admin() || m.customer_id == user.id)
            .map(MeetingView::from)
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No meeting for booking {}", booking_id))
            })
    }

    /// Admin edit of platform, client details and time window
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        meeting_id: Uuid,
        input: UpdateMeetingRequest,
    ) -> Result<MeetingView, ServiceError> {
        input.validate()?;
        let model = self.find(meeting_id).await?;
        check_window(
            input.start_time.or(model.start_time),
            input.end_time.or(model.end_time),
        )?;

        let mut active: meeting::ActiveModel = model.into();
        if let Some(platform) = non_blank(input.platform) {
            active.platform = Set(platform);
        }
        if let Some(name) = non_blank(input.client_name) {
            active.client_name = Set(Some(name));
        }
        if let Some(email) = non_blank(input.client_email) {
            active.client_email = Set(Some(email));
        }
        if let Some(phone) = non_blank(input.client_phone) {
            active.client_phone = Set(Some(phone));
        }
        if let Some(notes) = input.client_notes {
            active.client_notes = Set(non_blank(Some(notes)));
        }
        if let Some(start) = input.start_time {
            active.start_time = Set(Some(start));
        }
        if let Some(end) = input.end_time {
            active.end_time = Set(Some(end));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(meeting_id = %meeting_id, "Meeting updated");
        Ok(updated.into())
    }

    /// `scheduled -> completed | cancelled`
    #[instrument(skip(self, input), fields(status = %input.status))]
    pub async fn update_status(
        &self,
        meeting_id: Uuid,
        input: UpdateMeetingStatusRequest,
    ) -> Result<MeetingView, ServiceError> {
        let txn = self.db.begin().await?;
        let model = meeting::Entity::find_by_id(meeting_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Meeting {} not found", meeting_id)))?;

        if !model.status.can_transition_to(input.status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Meeting cannot move from {} to {}",
                model.status, input.status
            )));
        }

        let mut active: meeting::ActiveModel = model.into();
        active.status = Set(input.status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        info!(meeting_id = %meeting_id, status = %updated.status, "Meeting status updated");
        Ok(updated.into())
    }

    /// Verifies (when a secret is configured) and applies a scheduling notification.
    /// Notifications for unknown tokens are acknowledged without changes.
    #[instrument(skip(self, signature, body), fields(size = body.len()))]
    pub async fn handle_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, ServiceError> {
        if let Some(secret) = &self.settings.webhook_secret {
            verify_signature(
                secret,
                signature,
                body,
                Utc::now(),
                self.settings.webhook_tolerance_secs,
            )?;
        }

        let webhook: SchedulingWebhook = serde_json::from_slice(body)
            .map_err(|e| ServiceError::BadRequest(format!("Malformed webhook payload: {}", e)))?;
        let mut outcome = WebhookOutcome {
            event: webhook.event.clone(),
            matched: false,
            meeting_id: None,
        };

        let Some(token) = webhook
            .payload
            .tracking
            .as_ref()
            .and_then(|t| non_blank(t.utm_content.clone()))
        else {
            debug!(event = %webhook.event, "Webhook without correlation token ignored");
            return Ok(outcome);
        };

        let Some(model) = meeting::Entity::find()
            .filter(meeting::Column::CorrelationToken.eq(token.as_str()))
            .one(&*self.db)
            .await?
        else {
            warn!(event = %webhook.event, "Webhook token matches no meeting");
            return Ok(outcome);
        };

        let meeting_id = model.id;
        let current_status = model.status;
        let payload = webhook.payload;
        let mut active: meeting::ActiveModel = model.into();
        match webhook.event.as_str() {
            "invitee.created" => {
                if let Some(name) = non_blank(payload.name.clone()) {
                    active.client_name = Set(Some(name));
                }
                if let Some(email) = non_blank(payload.email.clone()) {
                    active.client_email = Set(Some(email));
                }
                if let Some(phone) = payload.phone() {
                    active.client_phone = Set(Some(phone));
                }
                if let Some(notes) = payload.notes() {
                    active.client_notes = Set(Some(notes));
                }
                if let Some(event) = payload.scheduled_event {
                    check_window(event.start_time, event.end_time)?;
                    active.start_time = Set(event.start_time);
                    active.end_time = Set(event.end_time);
                }
            }
            "invitee.canceled" if current_status == MeetingStatus::Scheduled => {
                active.status = Set(MeetingStatus::Cancelled);
            }
            other => {
                debug!(event = other, "Webhook event needs no changes");
                outcome.matched = true;
                outcome.meeting_id = Some(meeting_id);
                return Ok(outcome);
            }
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        counter!("scheduling_webhooks_applied_total", 1, "event" => webhook.event.clone());
        info!(meeting_id = %meeting_id, event = %webhook.event, "Webhook applied to meeting");
        outcome.matched = true;
        outcome.meeting_id = Some(meeting_id);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sign(secret: &str, ts: i64, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", ts).as_bytes());
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[rstest]
    #[case("https://calendly.com/studio/konsultasi", "https://calendly.com/studio/konsultasi?utm_content=abc")]
    #[case("https://cal.example/x?a=1", "https://cal.example/x?a=1&utm_content=abc")]
    #[case("https://cal.example/x?", "https://cal.example/x?utm_content=abc")]
    #[case("https://cal.example/x#top", "https://cal.example/x?utm_content=abc#top")]
    fn token_is_appended(#[case] link: &str, #[case] expected: &str) {
        assert_eq!(with_correlation_token(link, "abc"), expected);
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = correlation_token();
        let b = correlation_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn signature_verification() {
        let body = br#"{"event":"invitee.created"}"#;
        let now = Utc::now();
        let ts = now.timestamp();
        let good = format!("t={},v1={}", ts, sign("s3cret", ts, body));

        assert!(verify_signature("s3cret", Some(&good), body, now, 300).is_ok());
        assert!(verify_signature("other", Some(&good), body, now, 300).is_err());
        assert!(verify_signature("s3cret", Some(&good), b"{}", now, 300).is_err());
        assert!(verify_signature("s3cret", None, body, now, 300).is_err());

        let stale_ts = ts - 3600;
        let stale = format!("t={},v1={}", stale_ts, sign("s3cret", stale_ts, body));
        assert!(verify_signature("s3cret", Some(&stale), body, now, 300).is_err());
    }

    #[test]
    fn payload_extracts_phone_and_notes() {
        let webhook: SchedulingWebhook = serde_json::from_value(serde_json::json!({
            "event": "invitee.created",
            "payload": {
                "name": "Rina",
                "questions_and_answers": [
                    { "question": "Nomor WhatsApp / Phone", "answer": "081234567890" },
                    { "question": "Konsep", "answer": "Outdoor" }
                ],
                "tracking": { "utm_content": "tok" },
                "unknown": 1
            }
        }))
        .unwrap();
        assert_eq!(webhook.payload.phone().as_deref(), Some("081234567890"));
        assert_eq!(
            webhook.payload.notes().as_deref(),
            Some("Nomor WhatsApp / Phone: 081234567890\nKonsep: Outdoor")
        );
    }
}
