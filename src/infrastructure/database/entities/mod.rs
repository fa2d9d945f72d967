//! Sea-ORM entity definitions
//!
//! Local mirrors of upstream records, keyed by their upstream identifiers,
//! plus the append-only activity log.

pub mod activity_log;
pub mod appointment;
pub mod claim;
pub mod clinic;
pub mod patient;
pub mod payment;

// Re-export all entities
pub use activity_log::Entity as ActivityLog;
pub use appointment::Entity as Appointment;
pub use claim::Entity as Claim;
pub use clinic::Entity as Clinic;
pub use patient::Entity as Patient;
pub use payment::Entity as Payment;
