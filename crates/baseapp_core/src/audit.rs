//! Audit trail for soft-delete lifecycle actions.
//!
//! # Responsibility
//! - Define the injected warn-level sink lifecycle actions write to.
//! - Keep the audit line format stable for log parsers.
//!
//! # Invariants
//! - One line per processed record, cascaded records included.
//! - Line shape: `<action> on: "<display> - pk: <id>" [<label>]`.

use crate::model::record::Record;
use log::warn;
use std::cell::RefCell;

/// Log target used by `LogAuditSink`.
pub const AUDIT_LOG_TARGET: &str = "user_logger";

/// Lifecycle action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    SoftDelete,
    Undelete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SoftDelete => "Soft-delete",
            Self::Undelete => "Un-delete",
        }
    }
}

/// Formats one audit line for `record`.
pub fn audit_line(action: AuditAction, record: &Record) -> String {
    format!(
        "{} on: \"{} - pk: {}\" [{}]",
        action.as_str(),
        record,
        record.id,
        record.label
    )
}

/// Warn-level sink receiving formatted audit lines.
pub trait AuditSink {
    fn warn(&self, message: &str);
}

impl<T: AuditSink + ?Sized> AuditSink for &T {
    fn warn(&self, message: &str) {
        (**self).warn(message);
    }
}

/// Forwards audit lines to the `log` facade under `AUDIT_LOG_TARGET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn warn(&self, message: &str) {
        warn!(target: AUDIT_LOG_TARGET, "{message}");
    }
}

/// Keeps audit lines in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    lines: RefCell<Vec<String>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of captured lines in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl AuditSink for MemoryAuditSink {
    fn warn(&self, message: &str) {
        self.lines.borrow_mut().push(message.to_string());
    }
}
