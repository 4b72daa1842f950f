//! Soft-delete lifecycle core for baseapp models.
//! Status-flagged records, declared cascade relations, and the
//! delete/undelete state machine over a SQLite record store.

pub mod audit;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod settings;
pub mod signals;

pub use audit::{AuditAction, AuditSink, LogAuditSink, MemoryAuditSink, AUDIT_LOG_TARGET};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError, LoggingStatus};
pub use model::record::{Record, RecordId, RecordStatus, RecordValidationError};
pub use model::registry::{CascadeEdge, ModelRegistry, OnDelete, RegistryError};
pub use repo::record_repo::{
    RecordQuery, RecordStore, RecordView, RepoError, RepoResult, SqliteRecordStore,
};
pub use service::lifecycle_service::{
    LifecycleError, LifecycleResult, Processed, SoftDeleteService,
};
pub use settings::{ModelDeclaration, RelationDeclaration, Settings, SettingsError};
pub use signals::{DeleteEvent, DeleteSignal, SignalBus};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
