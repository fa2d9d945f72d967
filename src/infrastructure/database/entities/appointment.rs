//! Appointment entity
//!
//! Created on first sighting from upstream, then only mutated. Carries the
//! scheduling window, the appointment status machine, and the eligibility
//! one-shot with its opaque payload.

use crate::domain::{AppointmentStatus, EligibilityStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Upstream appointment identifier
    #[sea_orm(unique)]
    pub external_apt_id: String,

    pub clinic_id: Uuid,
    pub patient_id: Uuid,

    pub scheduled_start: DateTimeUtc,
    pub scheduled_end: DateTimeUtc,

    pub status: AppointmentStatus,

    pub reason: Option<String>,
    pub notes: Option<String>,
    pub operatory: Option<String>,
    pub provider_name: Option<String>,

    pub eligibility_status: EligibilityStatus,
    /// Raw eligibility payload as returned by the upstream check
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub eligibility_details: Option<Json>,

    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub insurance_coverage_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub patient_responsibility_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))", nullable)]
    pub discount_amount: Option<Decimal>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clinic::Entity",
        from = "Column::ClinicId",
        to = "super::clinic::Column::Id"
    )]
    Clinic,
    #[sea_orm(
        belongs_to = "super::patient::Entity",
        from = "Column::PatientId",
        to = "super::patient::Column::Id"
    )]
    Patient,
    #[sea_orm(has_one = "super::claim::Entity")]
    Claim,
}

impl Related<super::clinic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clinic.def()
    }
}

impl Related<super::patient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Patient.def()
    }
}

impl Related<super::claim::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Claim.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
