//! Per-entity stores over the shared database
//!
//! Thin persistence services the engine drives: find by external id, merge,
//! save. They own no state beyond the database handle.

use crate::infrastructure::database::Database;
use sea_orm::DbErr;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod activity;
pub mod appointments;
pub mod claims;
pub mod clinics;
pub mod patients;
pub mod payments;

pub use activity::ActivityLogService;
pub use appointments::AppointmentService;
pub use claims::ClaimService;
pub use clinics::ClinicService;
pub use patients::PatientService;
pub use payments::PaymentService;

/// Store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("clinic {0} not found")]
    ClinicNotFound(Uuid),

    #[error("patient {0} not found")]
    PatientNotFound(Uuid),

    #[error("appointment {0} not found")]
    AppointmentNotFound(Uuid),

    #[error("claim {0} not found")]
    ClaimNotFound(Uuid),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Container for all entity stores
pub struct Services {
    pub clinics: ClinicService,
    pub patients: PatientService,
    pub appointments: AppointmentService,
    pub claims: ClaimService,
    pub payments: PaymentService,
    pub activity: ActivityLogService,
}

impl Services {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            clinics: ClinicService::new(Arc::clone(&db)),
            patients: PatientService::new(Arc::clone(&db)),
            appointments: AppointmentService::new(Arc::clone(&db)),
            claims: ClaimService::new(Arc::clone(&db)),
            payments: PaymentService::new(Arc::clone(&db)),
            activity: ActivityLogService::new(db),
        }
    }
}
