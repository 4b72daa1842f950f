//! Soft-delete lifecycle service.
//!
//! # Responsibility
//! - Apply soft delete and undelete to one record and, through declared
//!   cascade edges, to every dependent record.
//! - Emit delete signals and audit lines for each processed record.
//! - Expose the named record views (`all`, `deleted`, `offlined`,
//!   `drafted`).
//!
//! # Invariants
//! - Delete yields `Deleted` with a fresh tombstone; undelete always yields
//!   `Online` without one, whatever the status was before deletion.
//! - Delete cascades over visible dependents; undelete cascades over
//!   soft-deleted dependents. Each dependent is re-read before it is
//!   processed; one already in the target state is skipped, so cyclic and
//!   diamond-shaped links process every record once.
//! - The cascade walk is sequential and not transactional: the first error
//!   aborts it and earlier writes stay persisted. Wrap the call in
//!   `db::in_transaction` for all-or-nothing behavior.

use crate::audit::{audit_line, AuditAction, AuditSink, LogAuditSink};
use crate::db::DbError;
use crate::model::record::{now_epoch_ms, Record, RecordId};
use crate::model::registry::ModelRegistry;
use crate::repo::record_repo::{RecordQuery, RecordStore, RecordView, RepoError};
use crate::signals::{DeleteSignal, SignalBus};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors from lifecycle operations.
#[derive(Debug)]
pub enum LifecycleError {
    /// The record's label is not a registered soft-delete model.
    UnknownModel(String),
    Repo(RepoError),
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownModel(label) => write!(f, "model not registered: {label}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownModel(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for LifecycleError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DbError> for LifecycleError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

/// Per-label count of records touched by one lifecycle call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    by_label: BTreeMap<String, usize>,
}

impl Processed {
    /// Sum of all per-label counts.
    pub fn total(&self) -> usize {
        self.by_label.values().sum()
    }

    pub fn by_label(&self) -> &BTreeMap<String, usize> {
        &self.by_label
    }

    /// Count for one label, zero when untouched.
    pub fn count(&self, label: &str) -> usize {
        self.by_label.get(label).copied().unwrap_or(0)
    }

    /// `(total, by_label)` pair.
    pub fn into_parts(self) -> (usize, BTreeMap<String, usize>) {
        (self.total(), self.by_label)
    }

    fn add(&mut self, label: &str, amount: usize) {
        *self.by_label.entry(label.to_string()).or_insert(0) += amount;
    }

    /// Adds every count of `other` into `self`.
    pub fn merge(&mut self, other: Processed) {
        for (label, amount) in other.by_label {
            self.add(&label, amount);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Delete,
    Undelete,
}

impl Operation {
    fn audit_action(self) -> AuditAction {
        match self {
            Self::Delete => AuditAction::SoftDelete,
            Self::Undelete => AuditAction::Undelete,
        }
    }

    /// View dependents are fetched from during the cascade walk.
    fn cascade_view(self) -> RecordView {
        match self {
            Self::Delete => RecordView::Visible,
            Self::Undelete => RecordView::Deleted,
        }
    }

    fn event_name(self) -> &'static str {
        match self {
            Self::Delete => "soft_delete",
            Self::Undelete => "undelete",
        }
    }
}

/// Soft-delete state machine over a record store.
pub struct SoftDeleteService<'r, S, A = LogAuditSink> {
    store: S,
    registry: &'r ModelRegistry,
    signals: Option<&'r SignalBus>,
    audit: A,
}

impl<'r, S: RecordStore> SoftDeleteService<'r, S, LogAuditSink> {
    /// Creates a service auditing through the `log` facade, without signals.
    pub fn new(store: S, registry: &'r ModelRegistry) -> Self {
        Self {
            store,
            registry,
            signals: None,
            audit: LogAuditSink,
        }
    }
}

impl<'r, S: RecordStore, A: AuditSink> SoftDeleteService<'r, S, A> {
    /// Attaches delete observers.
    pub fn with_signals(mut self, signals: &'r SignalBus) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Replaces the audit sink.
    pub fn with_audit_sink<B: AuditSink>(self, audit: B) -> SoftDeleteService<'r, S, B> {
        SoftDeleteService {
            store: self.store,
            registry: self.registry,
            signals: self.signals,
            audit,
        }
    }

    /// Soft-deletes `record` and cascades to its visible dependents.
    ///
    /// # Side effects
    /// - `PreDelete`/`PostDelete` signals per processed record.
    /// - One `Soft-delete` audit line per processed record.
    ///
    /// # Errors
    /// - `UnknownModel` when the label is not registered.
    /// - Store errors abort the walk; records processed before stay deleted.
    pub fn delete(&self, record: &mut Record) -> LifecycleResult<Processed> {
        self.apply(record, Operation::Delete)
    }

    /// Restores `record` to `Online` and cascades to its soft-deleted
    /// dependents. Emits no signals.
    pub fn undelete(&self, record: &mut Record) -> LifecycleResult<Processed> {
        self.apply(record, Operation::Undelete)
    }

    /// Loads a record by id and soft-deletes it.
    pub fn delete_by_id(&self, id: RecordId) -> LifecycleResult<Processed> {
        let mut record = self.load(id)?;
        self.delete(&mut record)
    }

    /// Loads a record by id and undeletes it.
    pub fn undelete_by_id(&self, id: RecordId) -> LifecycleResult<Processed> {
        let mut record = self.load(id)?;
        self.undelete(&mut record)
    }

    /// Soft-deletes every record matching `query`, merging the counts.
    pub fn delete_where(&self, query: &RecordQuery) -> LifecycleResult<Processed> {
        self.apply_where(query, Operation::Delete)
    }

    /// Undeletes every record matching `query`, merging the counts.
    pub fn undelete_where(&self, query: &RecordQuery) -> LifecycleResult<Processed> {
        self.apply_where(query, Operation::Undelete)
    }

    /// Records of `label` without a tombstone.
    pub fn all(&self, label: &str) -> LifecycleResult<Vec<Record>> {
        self.view(label, RecordView::Visible)
    }

    pub fn deleted(&self, label: &str) -> LifecycleResult<Vec<Record>> {
        self.view(label, RecordView::Deleted)
    }

    pub fn offlined(&self, label: &str) -> LifecycleResult<Vec<Record>> {
        self.view(label, RecordView::Offlined)
    }

    pub fn drafted(&self, label: &str) -> LifecycleResult<Vec<Record>> {
        self.view(label, RecordView::Drafted)
    }

    /// Every physical record of `label`, soft-deleted ones included.
    pub fn everything(&self, label: &str) -> LifecycleResult<Vec<Record>> {
        self.view(label, RecordView::Everything)
    }

    fn view(&self, label: &str, view: RecordView) -> LifecycleResult<Vec<Record>> {
        self.ensure_registered(label)?;
        Ok(self.store.list_records(&RecordQuery::of(label, view))?)
    }

    fn load(&self, id: RecordId) -> LifecycleResult<Record> {
        self.store
            .get_record(id)?
            .ok_or(LifecycleError::Repo(RepoError::NotFound(id)))
    }

    fn ensure_registered(&self, label: &str) -> LifecycleResult<()> {
        if self.registry.is_registered(label) {
            Ok(())
        } else {
            Err(LifecycleError::UnknownModel(label.to_string()))
        }
    }

    fn apply_where(&self, query: &RecordQuery, op: Operation) -> LifecycleResult<Processed> {
        let mut processed = Processed::default();
        for mut record in self.store.list_records(query)? {
            processed.merge(self.apply(&mut record, op)?);
        }
        Ok(processed)
    }

    fn apply(&self, record: &mut Record, op: Operation) -> LifecycleResult<Processed> {
        self.ensure_registered(&record.label)?;

        if op == Operation::Delete {
            self.notify(DeleteSignal::PreDelete, record);
        }
        self.audit.warn(&audit_line(op.audit_action(), record));

        match op {
            Operation::Delete => record.mark_deleted(now_epoch_ms()),
            Operation::Undelete => record.mark_restored(),
        }
        self.store.save_record(record)?;

        if op == Operation::Delete {
            self.notify(DeleteSignal::PostDelete, record);
        }
        debug!(
            "event={} module=service status=ok label={} id={}",
            op.event_name(),
            record.label,
            record.id
        );

        let mut processed = Processed::default();
        processed.add(&record.label, 1);

        for edge in self.registry.cascade_edges(&record.label) {
            let dependents = self
                .store
                .related_records(record.id, edge, op.cascade_view())?;
            for dependent in dependents {
                // A sibling's cascade may already have moved this record.
                let Some(mut current) = self.store.get_record(dependent.id)? else {
                    continue;
                };
                if !op.cascade_view().contains(&current) {
                    continue;
                }
                processed.merge(self.apply(&mut current, op)?);
            }
        }

        Ok(processed)
    }

    fn notify(&self, signal: DeleteSignal, record: &Record) {
        if let Some(signals) = self.signals {
            signals.send(signal, &record.label, record.id);
        }
    }
}
