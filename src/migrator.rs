use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_accounts_tables::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_bookings_table::Migration),
            Box::new(m20240101_000004_create_meetings_table::Migration),
            Box::new(m20240101_000005_create_payments_table::Migration),
            Box::new(m20240101_000006_create_recap_runs_table::Migration),
        ]
    }
}

mod m20240101_000001_create_accounts_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_accounts_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Admins::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Admins::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Admins::Name).string().not_null())
                        .col(ColumnDef::new(Admins::Email).string().not_null())
                        .col(ColumnDef::new(Admins::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Admins::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Admins::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_admins_email")
                        .table(Admins::Table)
                        .col(Admins::Email)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Email).string().not_null())
                        .col(ColumnDef::new(Customers::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string_len(20).not_null())
                        .col(ColumnDef::new(Customers::ProfilePhoto).string().null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_email")
                        .table(Customers::Table)
                        .col(Customers::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Admins::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Admins {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Customers {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Phone,
        ProfilePhoto,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Services::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Services::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Services::Name).string().not_null())
                        .col(ColumnDef::new(Services::Slug).string().not_null())
                        .col(ColumnDef::new(Services::Category).string_len(32).not_null())
                        .col(ColumnDef::new(Services::Description).text().not_null())
                        .col(
                            ColumnDef::new(Services::PriceFrom)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Services::Turnaround).string().not_null())
                        .col(
                            ColumnDef::new(Services::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Services::IsFeatured)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Services::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Services::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_services_slug")
                        .table(Services::Table)
                        .col(Services::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_services_category")
                        .table(Services::Table)
                        .col(Services::Category)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ServiceMedia::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ServiceMedia::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceMedia::ServiceId).uuid().not_null())
                        .col(
                            ColumnDef::new(ServiceMedia::MediaType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ServiceMedia::File).string().not_null())
                        .col(
                            ColumnDef::new(ServiceMedia::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(ServiceMedia::Caption).string().null())
                        .col(
                            ColumnDef::new(ServiceMedia::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ServiceMedia::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_service_media_service_id")
                                .from(ServiceMedia::Table, ServiceMedia::ServiceId)
                                .to(Services::Table, Services::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_service_media_service_id")
                        .table(ServiceMedia::Table)
                        .col(ServiceMedia::ServiceId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ServiceMedia::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Services::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Services {
        Table,
        Id,
        Name,
        Slug,
        Category,
        Description,
        PriceFrom,
        Turnaround,
        IsActive,
        IsFeatured,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum ServiceMedia {
        Table,
        Id,
        ServiceId,
        MediaType,
        File,
        Position,
        Caption,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000003_create_bookings_table {
    use super::m20240101_000001_create_accounts_tables::Customers;
    use super::m20240101_000002_create_catalog_tables::Services;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_bookings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Bookings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bookings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bookings::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::ServiceId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::OrderCode).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Bookings::TrackingCode)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::EventName).string().not_null())
                        .col(ColumnDef::new(Bookings::EventDate).date().not_null())
                        .col(ColumnDef::new(Bookings::EventTime).string_len(16).null())
                        .col(ColumnDef::new(Bookings::EventLocation).string().not_null())
                        .col(ColumnDef::new(Bookings::Requirements).text().null())
                        .col(
                            ColumnDef::new(Bookings::TotalTagihan)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Bookings::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Bookings::InvoiceFile).string().null())
                        .col(ColumnDef::new(Bookings::AdminNotes).text().null())
                        .col(
                            ColumnDef::new(Bookings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bookings_customer_id")
                                .from(Bookings::Table, Bookings::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bookings_service_id")
                                .from(Bookings::Table, Bookings::ServiceId)
                                .to(Services::Table, Services::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_bookings_order_code", Bookings::OrderCode),
                ("idx_bookings_tracking_code", Bookings::TrackingCode),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Bookings::Table)
                            .col(column)
                            .unique()
                            .to_owned(),
                    )
                    .await?;
            }

            for (name, column) in [
                ("idx_bookings_customer_id", Bookings::CustomerId),
                ("idx_bookings_status", Bookings::Status),
                ("idx_bookings_created_at", Bookings::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Bookings::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Bookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Bookings {
        Table,
        Id,
        CustomerId,
        ServiceId,
        OrderCode,
        TrackingCode,
        EventName,
        EventDate,
        EventTime,
        EventLocation,
        Requirements,
        TotalTagihan,
        Status,
        InvoiceFile,
        AdminNotes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000004_create_meetings_table {
    use super::m20240101_000001_create_accounts_tables::{Admins, Customers};
    use super::m20240101_000003_create_bookings_table::Bookings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_meetings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Meetings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Meetings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Meetings::BookingId).uuid().not_null())
                        .col(ColumnDef::new(Meetings::AdminId).uuid().not_null())
                        .col(ColumnDef::new(Meetings::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Meetings::Platform).string_len(64).not_null())
                        .col(ColumnDef::new(Meetings::SchedulingLink).text().not_null())
                        .col(
                            ColumnDef::new(Meetings::CorrelationToken)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Meetings::ClientName).string().null())
                        .col(ColumnDef::new(Meetings::ClientEmail).string().null())
                        .col(ColumnDef::new(Meetings::ClientPhone).string_len(20).null())
                        .col(ColumnDef::new(Meetings::ClientNotes).text().null())
                        .col(
                            ColumnDef::new(Meetings::StartTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Meetings::EndTime)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Meetings::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Meetings::MouFile).string().null())
                        .col(
                            ColumnDef::new(Meetings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Meetings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_meetings_booking_id")
                                .from(Meetings::Table, Meetings::BookingId)
                                .to(Bookings::Table, Bookings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_meetings_admin_id")
                                .from(Meetings::Table, Meetings::AdminId)
                                .to(Admins::Table, Admins::Id)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_meetings_customer_id")
                                .from(Meetings::Table, Meetings::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One meeting per booking; concurrent creators race on this index.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_meetings_booking_id")
                        .table(Meetings::Table)
                        .col(Meetings::BookingId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_meetings_correlation_token")
                        .table(Meetings::Table)
                        .col(Meetings::CorrelationToken)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Meetings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Meetings {
        Table,
        Id,
        BookingId,
        AdminId,
        CustomerId,
        Platform,
        SchedulingLink,
        CorrelationToken,
        ClientName,
        ClientEmail,
        ClientPhone,
        ClientNotes,
        StartTime,
        EndTime,
        Status,
        MouFile,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000005_create_payments_table {
    use super::m20240101_000001_create_accounts_tables::{Admins, Customers};
    use super::m20240101_000003_create_bookings_table::Bookings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_payments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Payments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Payments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Payments::BookingId).uuid().not_null())
                        .col(ColumnDef::new(Payments::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Payments::AdminId).uuid().null())
                        .col(
                            ColumnDef::new(Payments::PaymentType)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Sequence).integer().not_null())
                        .col(ColumnDef::new(Payments::Amount).decimal_len(16, 2).not_null())
                        .col(
                            ColumnDef::new(Payments::SisaTagihan)
                                .decimal_len(16, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Payments::Percentage).integer().not_null())
                        .col(ColumnDef::new(Payments::Method).string_len(64).not_null())
                        .col(ColumnDef::new(Payments::ProofFile).string().null())
                        .col(ColumnDef::new(Payments::Status).string_len(32).not_null())
                        .col(
                            ColumnDef::new(Payments::Diverifikasi)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Payments::VerifiedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Payments::ReceiptFile).string().null())
                        .col(ColumnDef::new(Payments::Notes).text().null())
                        .col(
                            ColumnDef::new(Payments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Payments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_booking_id")
                                .from(Payments::Table, Payments::BookingId)
                                .to(Bookings::Table, Bookings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_customer_id")
                                .from(Payments::Table, Payments::CustomerId)
                                .to(Customers::Table, Customers::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_payments_admin_id")
                                .from(Payments::Table, Payments::AdminId)
                                .to(Admins::Table, Admins::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, column) in [
                ("idx_payments_booking_id", Payments::BookingId),
                ("idx_payments_status", Payments::Status),
                ("idx_payments_created_at", Payments::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Payments::Table)
                            .col(column)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Payments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Payments {
        Table,
        Id,
        BookingId,
        CustomerId,
        AdminId,
        PaymentType,
        Sequence,
        Amount,
        SisaTagihan,
        Percentage,
        Method,
        ProofFile,
        Status,
        Diverifikasi,
        VerifiedAt,
        ReceiptFile,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000006_create_recap_runs_table {
    use super::m20240101_000001_create_accounts_tables::Admins;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_recap_runs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut table = Table::create();
            table
                .table(RecapRuns::Table)
                .if_not_exists()
                .col(ColumnDef::new(RecapRuns::Id).uuid().primary_key().not_null())
                .col(ColumnDef::new(RecapRuns::AdminId).uuid().not_null())
                .col(ColumnDef::new(RecapRuns::PeriodStart).date().not_null())
                .col(ColumnDef::new(RecapRuns::PeriodEnd).date().not_null())
                .col(ColumnDef::new(RecapRuns::RunDay).integer().not_null())
                .col(ColumnDef::new(RecapRuns::RunMonth).integer().not_null())
                .col(ColumnDef::new(RecapRuns::RunYear).integer().not_null());

            for column in [
                RecapRuns::TotalBookings,
                RecapRuns::BookingsAwaiting,
                RecapRuns::BookingsValidated,
                RecapRuns::BookingsCancelled,
                RecapRuns::TotalMeetings,
                RecapRuns::MeetingsScheduled,
                RecapRuns::MeetingsCompleted,
                RecapRuns::MeetingsCancelled,
                RecapRuns::TotalPayments,
                RecapRuns::PaymentsVerified,
            ] {
                table.col(ColumnDef::new(column).integer().not_null().default(0));
            }

            for column in [
                RecapRuns::SumDp,
                RecapRuns::SumPelunasan,
                RecapRuns::SumFull,
                RecapRuns::SumLunas,
            ] {
                table.col(
                    ColumnDef::new(column)
                        .decimal_len(16, 2)
                        .not_null()
                        .default(0),
                );
            }

            table
                .col(ColumnDef::new(RecapRuns::ReportFile).string().not_null())
                .col(
                    ColumnDef::new(RecapRuns::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_recap_runs_admin_id")
                        .from(RecapRuns::Table, RecapRuns::AdminId)
                        .to(Admins::Table, Admins::Id)
                        .on_update(ForeignKeyAction::Cascade),
                );

            manager.create_table(table.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(RecapRuns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum RecapRuns {
        Table,
        Id,
        AdminId,
        PeriodStart,
        PeriodEnd,
        RunDay,
        RunMonth,
        RunYear,
        TotalBookings,
        BookingsAwaiting,
        BookingsValidated,
        BookingsCancelled,
        TotalMeetings,
        MeetingsScheduled,
        MeetingsCompleted,
        MeetingsCancelled,
        TotalPayments,
        PaymentsVerified,
        SumDp,
        SumPelunasan,
        SumFull,
        SumLunas,
        ReportFile,
        CreatedAt,
    }
}
