//! Infrastructure adapters: database, locking, upstream API, workflows

pub mod database;
pub mod lock;
pub mod upstream;
pub mod workflows;
