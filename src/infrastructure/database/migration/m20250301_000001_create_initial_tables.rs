//! Initial schema: clinics, patients, appointments, claims, payments

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clinics::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Clinics::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Clinics::Name).text().not_null().unique_key())
                    .col(
                        ColumnDef::new(Clinics::ExternalClinicId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Clinics::Timezone).text().not_null())
                    .col(ColumnDef::new(Clinics::ContactEmail).text())
                    .col(ColumnDef::new(Clinics::ContactPhone).text())
                    .col(ColumnDef::new(Clinics::ApiKey).text())
                    .col(
                        ColumnDef::new(Clinics::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Clinics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Patients::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Patients::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Patients::ExternalId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Patients::ClinicId).uuid().not_null())
                    .col(ColumnDef::new(Patients::FirstName).text().not_null())
                    .col(ColumnDef::new(Patients::LastName).text().not_null())
                    .col(ColumnDef::new(Patients::BirthDate).date())
                    .col(ColumnDef::new(Patients::Email).text())
                    .col(ColumnDef::new(Patients::PhoneNumber).text())
                    .col(
                        ColumnDef::new(Patients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Patients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_patients_clinic")
                            .from(Patients::Table, Patients::ClinicId)
                            .to(Clinics::Table, Clinics::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Appointments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Appointments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Appointments::ExternalAptId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Appointments::ClinicId).uuid().not_null())
                    .col(ColumnDef::new(Appointments::PatientId).uuid().not_null())
                    .col(
                        ColumnDef::new(Appointments::ScheduledStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Appointments::ScheduledEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Appointments::Status).text().not_null())
                    .col(ColumnDef::new(Appointments::Reason).text())
                    .col(ColumnDef::new(Appointments::Notes).text())
                    .col(ColumnDef::new(Appointments::Operatory).text())
                    .col(ColumnDef::new(Appointments::ProviderName).text())
                    .col(
                        ColumnDef::new(Appointments::EligibilityStatus)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Appointments::EligibilityDetails).json_binary())
                    .col(
                        ColumnDef::new(Appointments::InsuranceCoverageAmount)
                            .decimal_len(12, 2),
                    )
                    .col(
                        ColumnDef::new(Appointments::PatientResponsibilityAmount)
                            .decimal_len(12, 2),
                    )
                    .col(ColumnDef::new(Appointments::DiscountAmount).decimal_len(12, 2))
                    .col(
                        ColumnDef::new(Appointments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Appointments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_clinic")
                            .from(Appointments::Table, Appointments::ClinicId)
                            .to(Clinics::Table, Clinics::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_appointments_patient")
                            .from(Appointments::Table, Appointments::PatientId)
                            .to(Patients::Table, Patients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Claims::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Claims::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Claims::ExternalClaimId)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Claims::ClinicId).uuid().not_null())
                    .col(ColumnDef::new(Claims::PatientId).uuid().not_null())
                    .col(
                        ColumnDef::new(Claims::AppointmentId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Claims::Status).text().not_null())
                    .col(
                        ColumnDef::new(Claims::AmountBilled)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Claims::AmountApproved).decimal_len(12, 2))
                    .col(ColumnDef::new(Claims::RejectionReason).text())
                    .col(ColumnDef::new(Claims::Notes).text())
                    .col(ColumnDef::new(Claims::Metadata).json_binary())
                    .col(ColumnDef::new(Claims::LastPolledAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Claims::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Claims::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claims_clinic")
                            .from(Claims::Table, Claims::ClinicId)
                            .to(Clinics::Table, Clinics::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claims_patient")
                            .from(Claims::Table, Claims::PatientId)
                            .to(Patients::Table, Patients::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_claims_appointment")
                            .from(Claims::Table, Claims::AppointmentId)
                            .to(Appointments::Table, Appointments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payments::ClinicId).uuid().not_null())
                    .col(
                        ColumnDef::new(Payments::ClaimId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Payments::Amount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::Status).text().not_null())
                    .col(ColumnDef::new(Payments::Method).text())
                    .col(ColumnDef::new(Payments::ExternalPaymentId).text())
                    .col(ColumnDef::new(Payments::ReceivedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Payments::Metadata).json_binary())
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
                            .name("fk_payments_clinic")
                            .from(Payments::Table, Payments::ClinicId)
                            .to(Clinics::Table, Clinics::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_claim")
                            .from(Payments::Table, Payments::ClaimId)
                            .to(Claims::Table, Claims::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes the sync loops filter on
        manager
            .create_index(
                Index::create()
                    .name("idx_appointments_clinic_eligibility")
                    .table(Appointments::Table)
                    .col(Appointments::ClinicId)
                    .col(Appointments::EligibilityStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_claims_clinic_status")
                    .table(Claims::Table)
                    .col(Claims::ClinicId)
                    .col(Claims::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_patients_clinic")
                    .table(Patients::Table)
                    .col(Patients::ClinicId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Claims::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Appointments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Patients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clinics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Clinics {
    Table,
    Id,
    Name,
    ExternalClinicId,
    Timezone,
    ContactEmail,
    ContactPhone,
    ApiKey,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Patients {
    Table,
    Id,
    ExternalId,
    ClinicId,
    FirstName,
    LastName,
    BirthDate,
    Email,
    PhoneNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Appointments {
    Table,
    Id,
    ExternalAptId,
    ClinicId,
    PatientId,
    ScheduledStart,
    ScheduledEnd,
    Status,
    Reason,
    Notes,
    Operatory,
    ProviderName,
    EligibilityStatus,
    EligibilityDetails,
    InsuranceCoverageAmount,
    PatientResponsibilityAmount,
    DiscountAmount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Claims {
    Table,
    Id,
    ExternalClaimId,
    ClinicId,
    PatientId,
    AppointmentId,
    Status,
    AmountBilled,
    AmountApproved,
    RejectionReason,
    Notes,
    Metadata,
    LastPolledAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    ClinicId,
    ClaimId,
    Amount,
    Status,
    Method,
    ExternalPaymentId,
    ReceivedAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
}
