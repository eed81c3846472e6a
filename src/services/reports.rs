use crate::{
    entities::{
        booking::{self, BookingStatus},
        customer,
        meeting::{self, MeetingStatus},
        payment::{self, PaymentStatus, PaymentType},
        recap_run, service,
    },
    errors::ServiceError,
    services::{page_bounds, payments::Balance},
    storage::{public_url, FileStore, UploadFolder},
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const SUMMARY_SHEET: &str = "Ringkasan";
const DETAIL_SHEET: &str = "Detail Pemesanan";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateRecapRequest {
    /// First day included, `YYYY-MM-DD`
    #[schema(value_type = String)]
    pub period_start: NaiveDate,
    /// Last day included, `YYYY-MM-DD`
    #[schema(value_type = String)]
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecapListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecapRunView {
    pub id: Uuid,
    pub admin_id: Uuid,
    #[schema(value_type = String)]
    pub period_start: NaiveDate,
    #[schema(value_type = String)]
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
    #[schema(value_type = String)]
    pub sum_dp: Decimal,
    #[schema(value_type = String)]
    pub sum_pelunasan: Decimal,
    #[schema(value_type = String)]
    pub sum_full: Decimal,
    #[schema(value_type = String)]
    pub sum_lunas: Decimal,
    pub report_file: String,
    pub report_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<recap_run::Model> for RecapRunView {
    fn from(model: recap_run::Model) -> Self {
        let report_url = public_url(UploadFolder::Reports, &model.report_file);
        Self {
            id: model.id,
            admin_id: model.admin_id,
            period_start: model.period_start,
            period_end: model.period_end,
            run_day: model.run_day,
            run_month: model.run_month,
            run_year: model.run_year,
            total_bookings: model.total_bookings,
            bookings_awaiting: model.bookings_awaiting,
            bookings_validated: model.bookings_validated,
            bookings_cancelled: model.bookings_cancelled,
            total_meetings: model.total_meetings,
            meetings_scheduled: model.meetings_scheduled,
            meetings_completed: model.meetings_completed,
            meetings_cancelled: model.meetings_cancelled,
            total_payments: model.total_payments,
            payments_verified: model.payments_verified,
            sum_dp: model.sum_dp,
            sum_pelunasan: model.sum_pelunasan,
            sum_full: model.sum_full,
            sum_lunas: model.sum_lunas,
            report_file: model.report_file,
            report_url,
            created_at: model.created_at,
        }
    }
}

/// Aggregates over the records created in a period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecapTotals {
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
}

impl RecapTotals {
    /// Per-type sums count received money only (`lunas` or `cicilan`).
    pub fn tally(
        bookings: &[booking::Model],
        meetings: &[meeting::Model],
        payments: &[payment::Model],
    ) -> Self {
        let mut totals = RecapTotals {
            total_bookings: bookings.len() as i32,
            total_meetings: meetings.len() as i32,
            total_payments: payments.len() as i32,
            ..Default::default()
        };
        for b in bookings {
            match b.status {
                BookingStatus::AwaitingValidation => totals.bookings_awaiting += 1,
                BookingStatus::Validated => totals.bookings_validated += 1,
                BookingStatus::Cancelled => totals.bookings_cancelled += 1,
            }
        }
        for m in meetings {
            match m.status {
                MeetingStatus::Scheduled => totals.meetings_scheduled += 1,
                MeetingStatus::Completed => totals.meetings_completed += 1,
                MeetingStatus::Cancelled => totals.meetings_cancelled += 1,
            }
        }
        for p in payments {
            if p.diverifikasi {
                totals.payments_verified += 1;
            }
            if !matches!(p.status, PaymentStatus::Lunas | PaymentStatus::Cicilan) {
                continue;
            }
            match p.payment_type {
                PaymentType::Dp => totals.sum_dp += p.amount,
                PaymentType::Pelunasan => totals.sum_pelunasan += p.amount,
                PaymentType::Full => totals.sum_full += p.amount,
            }
            if p.status == PaymentStatus::Lunas {
                totals.sum_lunas += p.amount;
            }
        }
        totals
    }
}

/// One line of the detail sheet
#[derive(Debug, Clone)]
pub struct DetailRow {
    pub order_code: String,
    pub created_at: DateTime<Utc>,
    pub customer: String,
    pub service: String,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub status: String,
    pub meeting_status: String,
    pub total: Decimal,
    pub paid: Decimal,
    pub remaining: Decimal,
}

fn amount_cell(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Two-sheet workbook: period summary, then one row per booking.
pub fn build_workbook(
    period_start: NaiveDate,
    period_end: NaiveDate,
    totals: &RecapTotals,
    rows: &[DetailRow],
) -> Result<Vec<u8>, ServiceError> {
    let mut book = umya_spreadsheet::new_file();
    let sheet_error = |e: &str| ServiceError::DocumentError(format!("spreadsheet: {}", e));

    {
        let summary = book
            .get_sheet_by_name_mut("Sheet1")
            .ok_or_else(|| sheet_error("default sheet missing"))?;
        summary.set_name(SUMMARY_SHEET);
        summary.get_cell_mut((1, 1)).set_value("Rekap Periode");
        summary.get_cell_mut((2, 1)).set_value(format!(
            "{} s.d. {}",
            period_start.format("%d-%m-%Y"),
            period_end.format("%d-%m-%Y")
        ));

        let counts = [
            ("Total pemesanan", totals.total_bookings),
            ("Menunggu validasi", totals.bookings_awaiting),
            ("Tervalidasi", totals.bookings_validated),
            ("Dibatalkan", totals.bookings_cancelled),
            ("Total meeting", totals.total_meetings),
            ("Meeting terjadwal", totals.meetings_scheduled),
            ("Meeting selesai", totals.meetings_completed),
            ("Meeting dibatalkan", totals.meetings_cancelled),
            ("Total pembayaran", totals.total_payments),
            ("Pembayaran terverifikasi", totals.payments_verified),
        ];
        let mut row = 3u32;
        for (label, value) in counts {
            summary.get_cell_mut((1, row)).set_value(label);
            summary.get_cell_mut((2, row)).set_value_number(value as f64);
            row += 1;
        }
        let sums = [
            ("Jumlah DP", totals.sum_dp),
            ("Jumlah pelunasan", totals.sum_pelunasan),
            ("Jumlah full payment", totals.sum_full),
            ("Jumlah lunas", totals.sum_lunas),
        ];
        for (label, value) in sums {
            summary.get_cell_mut((1, row)).set_value(label);
            summary.get_cell_mut((2, row)).set_value_number(amount_cell(value));
            row += 1;
        }
    }

    let detail = book.new_sheet(DETAIL_SHEET).map_err(sheet_error)?;
    let headers = [
        "No. Pesanan",
        "Dibuat",
        "Pelanggan",
        "Layanan",
        "Acara",
        "Tanggal Acara",
        "Status",
        "Meeting",
        "Total",
        "Dibayar",
        "Sisa",
    ];
    for (col, header) in headers.iter().enumerate() {
        detail.get_cell_mut((col as u32 + 1, 1)).set_value(*header);
    }
    for (i, r) in rows.iter().enumerate() {
        let row = i as u32 + 2;
        detail.get_cell_mut((1, row)).set_value(r.order_code.as_str());
        detail
            .get_cell_mut((2, row))
            .set_value(r.created_at.format("%d-%m-%Y %H:%M").to_string());
        detail.get_cell_mut((3, row)).set_value(r.customer.as_str());
        detail.get_cell_mut((4, row)).set_value(r.service.as_str());
        detail.get_cell_mut((5, row)).set_value(r.event_name.as_str());
        detail
            .get_cell_mut((6, row))
            .set_value(r.event_date.format("%d-%m-%Y").to_string());
        detail.get_cell_mut((7, row)).set_value(r.status.as_str());
        detail.get_cell_mut((8, row)).set_value(r.meeting_status.as_str());
        detail.get_cell_mut((9, row)).set_value_number(amount_cell(r.total));
        detail.get_cell_mut((10, row)).set_value_number(amount_cell(r.paid));
        detail.get_cell_mut((11, row)).set_value_number(amount_cell(r.remaining));
    }

    let mut out = Cursor::new(Vec::<u8>::new());
    umya_spreadsheet::writer::xlsx::write_writer(&book, &mut out)
        .map_err(|e| ServiceError::DocumentError(format!("spreadsheet: {}", e)))?;
    Ok(out.into_inner())
}

/// Half-open UTC bounds `[start 00:00, end + 1 day 00:00)` of an inclusive date range.
pub(crate) fn period_bounds(
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
    if end < start {
        return Err(ServiceError::ValidationError(
            "period_end must not be before period_start".to_string(),
        ));
    }
    let after_end = end.checked_add_signed(Duration::days(1)).ok_or_else(|| {
        ServiceError::ValidationError(format!("period_end {} is out of range", end))
    })?;
    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        after_end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// Periodic recap ("rekap") exports
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DatabaseConnection>,
    files: Arc<FileStore>,
}

impl ReportService {
    pub fn new(db: Arc<DatabaseConnection>, files: Arc<FileStore>) -> Self {
        Self { db, files }
    }

    /// Aggregates the inclusive date range, writes the workbook and records the run.
    #[instrument(skip(self, input), fields(start = %input.period_start, end = %input.period_end))]
    pub async fn generate(
        &self,
        admin_id: Uuid,
        input: GenerateRecapRequest,
    ) -> Result<RecapRunView, ServiceError> {
        let (from, until) = period_bounds(input.period_start, input.period_end)?;

        let bookings = booking::Entity::find()
            .filter(booking::Column::CreatedAt.gte(from))
            .filter(booking::Column::CreatedAt.lt(until))
            .order_by_asc(booking::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let meetings = meeting::Entity::find()
            .filter(meeting::Column::CreatedAt.gte(from))
            .filter(meeting::Column::CreatedAt.lt(until))
            .all(&*self.db)
            .await?;
        let payments = payment::Entity::find()
            .filter(payment::Column::CreatedAt.gte(from))
            .filter(payment::Column::CreatedAt.lt(until))
            .all(&*self.db)
            .await?;
        let totals = RecapTotals::tally(&bookings, &meetings, &payments);

        let rows = self.detail_rows(&bookings).await?;
        let bytes = build_workbook(input.period_start, input.period_end, &totals, &rows)?;
        let prefix = format!(
            "rekap-{}-{}",
            input.period_start.format("%Y%m%d"),
            input.period_end.format("%Y%m%d")
        );
        let stored = self
            .files
            .write_generated(UploadFolder::Reports, &prefix, "xlsx", &bytes)
            .await?;

        let now = Utc::now();
        let inserted = recap_run::ActiveModel {
            id: Set(Uuid::new_v4()),
            admin_id: Set(admin_id),
            period_start: Set(input.period_start),
            period_end: Set(input.period_end),
            run_day: Set(now.day() as i32),
            run_month: Set(now.month() as i32),
            run_year: Set(now.year()),
            total_bookings: Set(totals.total_bookings),
            bookings_awaiting: Set(totals.bookings_awaiting),
            bookings_validated: Set(totals.bookings_validated),
            bookings_cancelled: Set(totals.bookings_cancelled),
            total_meetings: Set(totals.total_meetings),
            meetings_scheduled: Set(totals.meetings_scheduled),
            meetings_completed: Set(totals.meetings_completed),
            meetings_cancelled: Set(totals.meetings_cancelled),
            total_payments: Set(totals.total_payments),
            payments_verified: Set(totals.payments_verified),
            sum_dp: Set(totals.sum_dp),
            sum_pelunasan: Set(totals.sum_pelunasan),
            sum_full: Set(totals.sum_full),
            sum_lunas: Set(totals.sum_lunas),
            report_file: Set(stored.filename.clone()),
            created_at: Set(now),
        }
        .insert(&*self.db)
        .await;
        let model = match inserted {
            Ok(model) => model,
            Err(e) => {
                self.files
                    .remove_quietly(UploadFolder::Reports, Some(&stored.filename))
                    .await;
                return Err(e.into());
            }
        };

        counter!("recap_runs_total", 1);
        info!(
            recap_id = %model.id,
            bookings = totals.total_bookings,
            payments = totals.total_payments,
            "Recap generated"
        );
        Ok(model.into())
    }

    async fn detail_rows(&self, bookings: &[booking::Model]) -> Result<Vec<DetailRow>, ServiceError> {
        let booking_ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
        let service_ids: Vec<Uuid> = bookings.iter().map(|b| b.service_id).collect();
        let customer_ids: Vec<Uuid> = bookings.iter().map(|b| b.customer_id).collect();

        let services: HashMap<Uuid, String> = service::Entity::find()
            .filter(service::Column::Id.is_in(service_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let customers: HashMap<Uuid, String> = customer::Entity::find()
            .filter(customer::Column::Id.is_in(customer_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        let meetings: HashMap<Uuid, MeetingStatus> = meeting::Entity::find()
            .filter(meeting::Column::BookingId.is_in(booking_ids.clone()))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| (m.booking_id, m.status))
            .collect();
        let mut payments: HashMap<Uuid, Vec<payment::Model>> = HashMap::new();
        for p in payment::Entity::find()
            .filter(payment::Column::BookingId.is_in(booking_ids))
            .all(&*self.db)
            .await?
        {
            payments.entry(p.booking_id).or_default().push(p);
        }

        Ok(bookings
            .iter()
            .map(|b| {
                let balance = Balance::of(
                    b.total_tagihan,
                    payments.get(&b.id).map(Vec::as_slice).unwrap_or(&[]),
                );
                DetailRow {
                    order_code: b.order_code.clone(),
                    created_at: b.created_at,
                    customer: customers.get(&b.customer_id).cloned().unwrap_or_default(),
                    service: services.get(&b.service_id).cloned().unwrap_or_default(),
                    event_name: b.event_name.clone(),
                    event_date: b.event_date,
                    status: b.status.to_string(),
                    meeting_status: meetings
                        .get(&b.id)
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    total: balance.total,
                    paid: balance.paid,
                    remaining: balance.remaining,
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, query: RecapListQuery) -> Result<(Vec<RecapRunView>, u64), ServiceError> {
        let (page, limit) = page_bounds(query.page, query.limit);
        let paginator = recap_run::Entity::find()
            .order_by_desc(recap_run::Column::CreatedAt)
            .paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let runs = paginator.fetch_page(page - 1).await?;
        Ok((runs.into_iter().map(RecapRunView::from).collect(), total))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, recap_id: Uuid) -> Result<RecapRunView, ServiceError> {
        recap_run::Entity::find_by_id(recap_id)
            .one(&*self.db)
            .await?
            .map(RecapRunView::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Recap {} not found", recap_id)))
    }
}
