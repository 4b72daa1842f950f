//! Record domain model and static model declarations.
//!
//! # Responsibility
//! - Define the status-flagged record used by every soft-delete model.
//! - Declare which models exist and which relations cascade.
//!
//! # Invariants
//! - Deletion is represented by a status flag plus tombstone timestamp,
//!   never by removing the row.

pub mod record;
pub mod registry;
