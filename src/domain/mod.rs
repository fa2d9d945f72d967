//! Domain types and rules shared across the engine

pub mod status;

pub use status::{AppointmentStatus, ClaimStatus, EligibilityStatus, PaymentStatus};
