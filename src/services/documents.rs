use crate::{
    config::StudioProfile,
    documents::{format_rupiah, terbilang, DocumentKind, DocumentRenderer},
    entities::{
        booking, customer, meeting,
        payment::{self, PaymentStatus, PaymentType},
        service,
    },
    errors::ServiceError,
    services::payments::{payments_for, type_label, Balance},
    storage::{FileStore, StoredFile},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    /// Payment, booking or meeting the document was generated from
    pub entity_id: Uuid,
    pub file: StoredFile,
}

fn date_label(at: DateTime<Utc>) -> String {
    at.format("%d-%m-%Y").to_string()
}

fn time_label(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%d-%m-%Y %H:%M UTC").to_string())
        .unwrap_or_default()
}

/// Records joined for one booking-centred document
struct BookingRecords {
    booking: booking::Model,
    service: Option<service::Model>,
    customer: Option<customer::Model>,
    payments: Vec<payment::Model>,
}

/// Receipts, invoices and agreements rendered to PDF and kept in the typed upload folders
#[derive(Clone)]
pub struct DocumentService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStore>,
    renderer: Arc<DocumentRenderer>,
    studio: StudioProfile,
}

impl DocumentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        files: Arc<FileStore>,
        renderer: Arc<DocumentRenderer>,
        studio: StudioProfile,
    ) -> Self {
        Self {
            db,
            files,
            renderer,
            studio,
        }
    }

    async fn booking_records(&self, booking_id: Uuid) -> Result<BookingRecords, ServiceError> {
        let booking = booking::Entity::find_by_id(booking_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;
        let service = service::Entity::find_by_id(booking.service_id)
            .one(&*self.db)
            .await?;
        let customer = customer::Entity::find_by_id(booking.customer_id)
            .one(&*self.db)
            .await?;
        let payments = payments_for(&*self.db, booking.id).await?;
        Ok(BookingRecords {
            booking,
            service,
            customer,
            payments,
        })
    }

    /// Context keys shared by every template
    fn base_context(&self, records: &BookingRecords) -> Value {
        let booking = &records.booking;
        let balance = Balance::of(booking.total_tagihan, &records.payments);
        let total = booking.total_tagihan;

        let payment_rows: Vec<Value> = records
            .payments
            .iter()
            .map(|p| {
                json!({
                    "sequence": p.sequence,
                    "type_label": type_label(p.payment_type),
                    "amount": format_rupiah(p.amount),
                    "status": p.status.to_string(),
                    "date": date_label(p.created_at),
                })
            })
            .collect();

        json!({
            "studio": {
                "name": self.studio.name,
                "address": self.studio.address,
                "phone": self.studio.phone,
                "email": self.studio.email,
                "bank_name": self.studio.bank_name,
                "bank_account_number": self.studio.bank_account_number,
                "bank_account_holder": self.studio.bank_account_holder,
                "signatory": self.studio.signatory,
            },
            "issued_at": date_label(Utc::now()),
            "customer": records.customer.as_ref().map(|c| json!({
                "name": c.name,
                "email": c.email,
                "phone": c.phone,
            })),
            "booking": {
                "order_code": booking.order_code,
                "tracking_code": booking.tracking_code,
                "event_name": booking.event_name,
                "event_date": booking.event_date.format("%d-%m-%Y").to_string(),
                "event_time": booking.event_time,
                "event_location": booking.event_location,
                "requirements": booking.requirements,
                "status": booking.status.to_string(),
            },
            "service": records.service.as_ref().map(|s| json!({
                "name": s.name,
                "category": s.category.to_string(),
                "turnaround": s.turnaround,
            })),
            "totals": {
                "total": format_rupiah(total),
                "paid": format_rupiah(balance.paid),
                "remaining": format_rupiah(balance.remaining),
                "total_words": terbilang(total),
            },
            "tiers": {
                "dp": format_rupiah(PaymentType::Dp.expected_amount(total)),
                "pelunasan": format_rupiah(PaymentType::Pelunasan.expected_amount(total)),
                "full": format_rupiah(PaymentType::Full.expected_amount(total)),
            },
            "payments": payment_rows,
        })
    }

    async fn kwitansi_context(
        &self,
        payment_id: Uuid,
    ) -> Result<(payment::Model, Value), ServiceError> {
        let payment = payment::Entity::find_by_id(payment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;
        if payment.status != PaymentStatus::Lunas {
            return Err(ServiceError::InvalidStatus(format!(
                "Receipts are issued for lunas payments only; payment is {}",
                payment.status
            )));
        }

        let records = self.booking_records(payment.booking_id).await?;
        let mut context = self.base_context(&records);
        context["receipt_number"] = json!(format!(
            "KWT/{}/{}",
            records.booking.order_code, payment.sequence
        ));
        context["payment"] = json!({
            "amount": format_rupiah(payment.amount),
            "amount_words": terbilang(payment.amount),
            "type_label": type_label(payment.payment_type),
            "percentage": payment.percentage,
            "sequence": payment.sequence,
            "method": payment.method,
            "verified_at": time_label(payment.verified_at),
        });
        Ok((payment, context))
    }

    async fn invoice_context(
        &self,
        booking_id: Uuid,
    ) -> Result<(booking::Model, Value), ServiceError> {
        let records = self.booking_records(booking_id).await?;
        let context = self.base_context(&records);
        Ok((records.booking, context))
    }

    async fn mou_context(&self, meeting_id: Uuid) -> Result<(meeting::Model, Value), ServiceError> {
        let meeting = meeting::Entity::find_by_id(meeting_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Meeting {} not found", meeting_id)))?;

        let records = self.booking_records(meeting.booking_id).await?;
        let mut context = self.base_context(&records);
        context["mou_number"] = json!(format!("MOU/{}", records.booking.order_code));
        context["client"] = json!({
            "name": meeting.client_name,
            "email": meeting.client_email,
            "phone": meeting.client_phone,
            "notes": meeting.client_notes,
        });
        context["meeting"] = json!({
            "platform": meeting.platform,
            "start_time": time_label(meeting.start_time),
            "end_time": time_label(meeting.end_time),
            "status": meeting.status.to_string(),
        });
        Ok((meeting, context))
    }

    /// Substituted template for a document, without writing anything
    #[instrument(skip(self))]
    pub async fn preview(&self, kind: DocumentKind, id: Uuid) -> Result<String, ServiceError> {
        let context = match kind {
            DocumentKind::Kwitansi => self.kwitansi_context(id).await?.1,
            DocumentKind::Invoice => self.invoice_context(id).await?.1,
            DocumentKind::Mou => self.mou_context(id).await?.1,
        };
        self.renderer.render_html(kind, &context)
    }

    async fn write_pdf(
        &self,
        kind: DocumentKind,
        prefix: &str,
        context: &Value,
    ) -> Result<StoredFile, ServiceError> {
        let bytes = self.renderer.render_pdf(kind, context)?;
        self.files
            .write_generated(kind.folder(), prefix, "pdf", &bytes)
            .await
    }

    /// Drops the new file when recording it fails, otherwise the superseded one.
    async fn settle_files<T>(
        &self,
        kind: DocumentKind,
        stored: &StoredFile,
        previous: Option<String>,
        recorded: Result<T, sea_orm::DbErr>,
    ) -> Result<T, ServiceError> {
        match recorded {
            Ok(value) => {
                self.files
                    .remove_quietly(kind.folder(), previous.as_deref())
                    .await;
                counter!("documents_generated_total", 1, "kind" => kind.to_string());
                Ok(value)
            }
            Err(e) => {
                self.files
                    .remove_quietly(kind.folder(), Some(&stored.filename))
                    .await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn kwitansi(&self, payment_id: Uuid) -> Result<GeneratedDocument, ServiceError> {
        let kind = DocumentKind::Kwitansi;
        let (payment, context) = self.kwitansi_context(payment_id).await?;
        let prefix = format!(
            "kwitansi-{}-{}",
            context["booking"]["order_code"].as_str().unwrap_or("payment"),
            payment.sequence
        );
        let stored = self.write_pdf(kind, &prefix, &context).await?;

        let previous = payment.receipt_file.clone();
        let mut active: payment::ActiveModel = payment.into();
        active.receipt_file = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now());
        let recorded = active.update(&*self.db).await;
        self.settle_files(kind, &stored, previous, recorded).await?;

        info!(payment_id = %payment_id, file = %stored.filename, "Receipt generated");
        Ok(GeneratedDocument {
            kind,
            entity_id: payment_id,
            file: stored,
        })
    }

    #[instrument(skip(self))]
    pub async fn invoice(&self, booking_id: Uuid) -> Result<GeneratedDocument, ServiceError> {
        let kind = DocumentKind::Invoice;
        let (booking, context) = self.invoice_context(booking_id).await?;
        let prefix = format!("invoice-{}", booking.order_code);
        let stored = self.write_pdf(kind, &prefix, &context).await?;

        let previous = booking.invoice_file.clone();
        let mut active: booking::ActiveModel = booking.into();
        active.invoice_file = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now());
        let recorded = active.update(&*self.db).await;
        self.settle_files(kind, &stored, previous, recorded).await?;

        info!(booking_id = %booking_id, file = %stored.filename, "Invoice generated");
        Ok(GeneratedDocument {
            kind,
            entity_id: booking_id,
            file: stored,
        })
    }

    #[instrument(skip(self))]
    pub async fn mou(&self, meeting_id: Uuid) -> Result<GeneratedDocument, ServiceError> {
        let kind = DocumentKind::Mou;
        let (meeting, context) = self.mou_context(meeting_id).await?;
        let prefix = format!(
            "mou-{}",
            context["booking"]["order_code"].as_str().unwrap_or("meeting")
        );
        let stored = self.write_pdf(kind, &prefix, &context).await?;

        let previous = meeting.mou_file.clone();
        let mut active: meeting::ActiveModel = meeting.into();
        active.mou_file = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now());
        let recorded = active.update(&*self.db).await;
        self.settle_files(kind, &stored, previous, recorded).await?;

        info!(meeting_id = %meeting_id, file = %stored.filename, "MoU generated");
        Ok(GeneratedDocument {
            kind,
            entity_id: meeting_id,
            file: stored,
        })
    }
}
