//! Record domain model.
//!
//! # Responsibility
//! - Define the status-flagged record shared by every soft-delete model.
//! - Provide lifecycle helpers that keep status and tombstone in sync.
//!
//! # Invariants
//! - `id` is stable and never reused for another record.
//! - `deleted_at` is set iff `status == RecordStatus::Deleted`.
//! - `label` has the `app.Model` shape and identifies the record type.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every persisted record.
pub type RecordId = Uuid;

static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*$")
        .expect("label pattern must compile")
});

/// Publication/lifecycle status of a record.
///
/// Integer codes are the persisted representation and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Hidden by an editor, not deleted.
    Offline,
    /// Visible. Default for new records.
    #[default]
    Online,
    /// Soft-deleted; `deleted_at` carries the tombstone time.
    Deleted,
    /// Work in progress, not yet published.
    Draft,
}

impl RecordStatus {
    /// Persisted integer code.
    pub fn code(self) -> i64 {
        match self {
            Self::Offline => 0,
            Self::Online => 1,
            Self::Deleted => 2,
            Self::Draft => 3,
        }
    }

    /// Parses a persisted integer code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Offline),
            1 => Some(Self::Online),
            2 => Some(Self::Deleted),
            3 => Some(Self::Draft),
            _ => None,
        }
    }

    /// Stable lowercase name used by CLI and settings input.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Deleted => "deleted",
            Self::Draft => "draft",
        }
    }

    /// Parses a lowercase status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "offline" => Some(Self::Offline),
            "online" => Some(Self::Online),
            "deleted" => Some(Self::Deleted),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

impl Display for RecordStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors for record invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValidationError {
    /// Label does not match `app.Model`.
    InvalidLabel(String),
    /// `status == Deleted` without `deleted_at`, or the reverse.
    TombstoneMismatch {
        status: RecordStatus,
        has_deleted_at: bool,
    },
    /// Deletion can only be produced by the lifecycle service.
    DeletedStatusNotSettable,
}

impl Display for RecordValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLabel(label) => {
                write!(f, "invalid model label `{label}`; expected `app.Model`")
            }
            Self::TombstoneMismatch {
                status,
                has_deleted_at,
            } => write!(
                f,
                "status `{status}` is inconsistent with deleted_at present={has_deleted_at}"
            ),
            Self::DeletedStatusNotSettable => {
                write!(f, "status `deleted` can only be set through soft delete")
            }
        }
    }
}

impl Error for RecordValidationError {}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Returns whether `label` has the `app.Model` shape.
pub fn is_valid_label(label: &str) -> bool {
    LABEL_PATTERN.is_match(label)
}

/// Status-flagged record participating in soft delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity (primary key).
    pub id: RecordId,
    /// Type label, e.g. `blog.Post`.
    pub label: String,
    /// Human-readable representation used in audit lines.
    pub display: String,
    pub status: RecordStatus,
    /// Unix epoch milliseconds. Set only while soft-deleted.
    pub deleted_at: Option<i64>,
    /// Unix epoch milliseconds. Store-managed.
    pub created_at: i64,
    /// Unix epoch milliseconds. Store-managed.
    pub updated_at: i64,
}

impl Record {
    /// Creates a new ONLINE record with a generated id.
    pub fn new(label: impl Into<String>, display: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), label, display)
    }

    /// Creates a new ONLINE record with a caller-provided id.
    ///
    /// Timestamps stay zero until the store assigns them.
    pub fn with_id(id: RecordId, label: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            display: display.into(),
            status: RecordStatus::Online,
            deleted_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Sets a non-deleted status (online, offline or draft).
    ///
    /// # Errors
    /// - `DeletedStatusNotSettable` for `RecordStatus::Deleted`.
    /// - `TombstoneMismatch` when the record is currently soft-deleted.
    pub fn set_status(&mut self, status: RecordStatus) -> Result<(), RecordValidationError> {
        if status == RecordStatus::Deleted {
            return Err(RecordValidationError::DeletedStatusNotSettable);
        }
        if self.is_deleted() {
            return Err(RecordValidationError::TombstoneMismatch {
                status,
                has_deleted_at: true,
            });
        }
        self.status = status;
        Ok(())
    }

    /// Marks the record soft-deleted at `at_ms`.
    pub fn mark_deleted(&mut self, at_ms: i64) {
        self.status = RecordStatus::Deleted;
        self.deleted_at = Some(at_ms);
    }

    /// Clears the tombstone and puts the record back ONLINE.
    ///
    /// Any status held before deletion is not restored.
    pub fn mark_restored(&mut self) {
        self.status = RecordStatus::Online;
        self.deleted_at = None;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Checks label shape and the status/tombstone invariant.
    pub fn validate(&self) -> Result<(), RecordValidationError> {
        if !is_valid_label(&self.label) {
            return Err(RecordValidationError::InvalidLabel(self.label.clone()));
        }
        let status_deleted = self.status == RecordStatus::Deleted;
        if status_deleted != self.deleted_at.is_some() {
            return Err(RecordValidationError::TombstoneMismatch {
                status: self.status,
                has_deleted_at: self.deleted_at.is_some(),
            });
        }
        Ok(())
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}
