//! Lifecycle services.
//!
//! # Responsibility
//! - Orchestrate store calls into delete/undelete use cases.
//! - Keep CLI and embedding callers decoupled from storage details.

pub mod lifecycle_service;
