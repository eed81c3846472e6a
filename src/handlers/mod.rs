pub mod auth;
pub mod common;
pub mod documents;
pub mod layanan;
pub mod layanan_media;
pub mod meeting;
pub mod pembayaran;
pub mod pemesanan;
pub mod pengguna;
pub mod rekap;
pub mod upload;

use crate::{
    auth::AuthService,
    config::AppConfig,
    documents::DocumentRenderer,
    errors::ServiceError,
    services::{
        account::AccountService,
        bookings::BookingService,
        catalog::CatalogService,
        customers::CustomerService,
        documents::DocumentService,
        meetings::{MeetingService, MeetingSettings},
        payments::PaymentService,
        reports::ReportService,
    },
    storage::FileStore,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub auth: Arc<AuthService>,
    pub files: Arc<FileStore>,
    pub accounts: Arc<AccountService>,
    pub customers: Arc<CustomerService>,
    pub catalog: Arc<CatalogService>,
    pub bookings: Arc<BookingService>,
    pub payments: Arc<PaymentService>,
    pub meetings: Arc<MeetingService>,
    pub documents: Arc<DocumentService>,
    pub reports: Arc<ReportService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        auth: Arc<AuthService>,
        files: Arc<FileStore>,
    ) -> Result<Self, ServiceError> {
        let renderer = Arc::new(DocumentRenderer::new()?);

        Ok(Self {
            accounts: Arc::new(AccountService::new(db.clone(), auth.clone())),
            customers: Arc::new(CustomerService::new(db.clone(), files.clone())),
            catalog: Arc::new(CatalogService::new(db.clone(), files.clone())),
            bookings: Arc::new(BookingService::new(db.clone())),
            payments: Arc::new(PaymentService::new(db.clone(), files.clone())),
            meetings: Arc::new(MeetingService::new(
                db.clone(),
                MeetingSettings::from(config),
            )),
            documents: Arc::new(DocumentService::new(
                db.clone(),
                files.clone(),
                renderer,
                config.studio.clone(),
            )),
            reports: Arc::new(ReportService::new(db, files.clone())),
            auth,
            files,
        })
    }
}
