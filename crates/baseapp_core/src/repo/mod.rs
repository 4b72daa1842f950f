//! Persistence contracts and the SQLite record store.
//!
//! # Responsibility
//! - Define the store surface the lifecycle service depends on.
//! - Isolate SQLite query details from lifecycle orchestration.
//!
//! # Invariants
//! - Store writes enforce `Record::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod record_repo;
