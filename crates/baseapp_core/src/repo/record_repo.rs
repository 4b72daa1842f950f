//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the persistence surface the lifecycle service consumes:
//!   create/save/get, cascade links, filtered listing, dependent lookup.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Record::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing order is insertion order (`created_at ASC, rowid ASC`).

use crate::db::DbError;
use crate::model::record::{now_epoch_ms, Record, RecordId, RecordStatus, RecordValidationError};
use crate::model::registry::CascadeEdge;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const RECORD_SELECT_SQL: &str = "SELECT
    r.id AS id,
    r.label AS label,
    r.display AS display,
    r.status AS status,
    r.deleted_at AS deleted_at,
    r.created_at AS created_at,
    r.updated_at AS updated_at
FROM records AS r";

const RECORD_ORDER_SQL: &str = " ORDER BY r.created_at ASC, r.rowid ASC";

pub type RepoResult<T> = Result<T, RepoError>;

/// Store error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(RecordValidationError),
    Db(DbError),
    NotFound(RecordId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<RecordValidationError> for RepoError {
    fn from(value: RecordValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Named record views.
///
/// `Visible` is the default: soft-deleted rows still exist physically but
/// never show up in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordView {
    /// `deleted_at` unset.
    #[default]
    Visible,
    /// `status == Deleted` and `deleted_at` set.
    Deleted,
    /// `status == Offline` and `deleted_at` unset.
    Offlined,
    /// `status == Draft` and `deleted_at` unset.
    Drafted,
    /// Every physical row.
    Everything,
}

impl RecordView {
    fn where_clause(self) -> String {
        match self {
            Self::Visible => "r.deleted_at IS NULL".to_string(),
            Self::Deleted => format!(
                "r.status = {} AND r.deleted_at IS NOT NULL",
                RecordStatus::Deleted.code()
            ),
            Self::Offlined => format!(
                "r.status = {} AND r.deleted_at IS NULL",
                RecordStatus::Offline.code()
            ),
            Self::Drafted => format!(
                "r.status = {} AND r.deleted_at IS NULL",
                RecordStatus::Draft.code()
            ),
            Self::Everything => "1 = 1".to_string(),
        }
    }

    /// In-memory form of `where_clause`.
    pub fn contains(self, record: &Record) -> bool {
        let live = record.deleted_at.is_none();
        match self {
            Self::Visible => live,
            Self::Deleted => record.status == RecordStatus::Deleted && !live,
            Self::Offlined => record.status == RecordStatus::Offline && live,
            Self::Drafted => record.status == RecordStatus::Draft && live,
            Self::Everything => true,
        }
    }
}

/// Query options for listing records.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub label: Option<String>,
    pub view: RecordView,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl RecordQuery {
    /// Records of one label in one view.
    pub fn of(label: impl Into<String>, view: RecordView) -> Self {
        Self {
            label: Some(label.into()),
            view,
            ..Self::default()
        }
    }
}

/// Persistence contract consumed by the lifecycle service.
pub trait RecordStore {
    fn create_record(&self, record: &Record) -> RepoResult<RecordId>;
    /// Persists display/status/tombstone of an existing record.
    fn save_record(&self, record: &Record) -> RepoResult<()>;
    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>>;
    /// Points `child`'s `foreign_key` at `owner`, replacing any previous link.
    fn link_record(&self, child: RecordId, foreign_key: &str, owner: RecordId) -> RepoResult<()>;
    fn list_records(&self, query: &RecordQuery) -> RepoResult<Vec<Record>>;
    /// Dependents of `owner` through `edge`, filtered by `view`.
    fn related_records(
        &self,
        owner: RecordId,
        edge: &CascadeEdge,
        view: RecordView,
    ) -> RepoResult<Vec<Record>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn create_record(&self, record: &Record) -> RepoResult<RecordId> {
        (**self).create_record(record)
    }

    fn save_record(&self, record: &Record) -> RepoResult<()> {
        (**self).save_record(record)
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>> {
        (**self).get_record(id)
    }

    fn link_record(&self, child: RecordId, foreign_key: &str, owner: RecordId) -> RepoResult<()> {
        (**self).link_record(child, foreign_key, owner)
    }

    fn list_records(&self, query: &RecordQuery) -> RepoResult<Vec<Record>> {
        (**self).list_records(query)
    }

    fn related_records(
        &self,
        owner: RecordId,
        edge: &CascadeEdge,
        view: RecordView,
    ) -> RepoResult<Vec<Record>> {
        (**self).related_records(owner, edge, view)
    }
}

/// SQLite-backed record store.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn create_record(&self, record: &Record) -> RepoResult<RecordId> {
        record.validate()?;
        let now = now_epoch_ms();

        self.conn.execute(
            "INSERT INTO records (
                id,
                label,
                display,
                status,
                deleted_at,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
            params![
                record.id.to_string(),
                record.label.as_str(),
                record.display.as_str(),
                record.status.code(),
                record.deleted_at,
                now,
            ],
        )?;

        Ok(record.id)
    }

    fn save_record(&self, record: &Record) -> RepoResult<()> {
        record.validate()?;

        let changed = self.conn.execute(
            "UPDATE records
             SET
                display = ?1,
                status = ?2,
                deleted_at = ?3,
                updated_at = ?4
             WHERE id = ?5;",
            params![
                record.display.as_str(),
                record.status.code(),
                record.deleted_at,
                now_epoch_ms(),
                record.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id));
        }

        Ok(())
    }

    fn get_record(&self, id: RecordId) -> RepoResult<Option<Record>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RECORD_SELECT_SQL} WHERE r.id = ?1;"))?;
        let row = stmt
            .query_row([id.to_string()], |row| Ok(parse_record_row(row)))
            .optional()?;
        row.transpose()
    }

    fn link_record(&self, child: RecordId, foreign_key: &str, owner: RecordId) -> RepoResult<()> {
        for id in [child, owner] {
            if self.get_record(id)?.is_none() {
                return Err(RepoError::NotFound(id));
            }
        }

        self.conn.execute(
            "INSERT INTO record_links (record_id, foreign_key, owner_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (record_id, foreign_key) DO UPDATE SET owner_id = excluded.owner_id;",
            params![child.to_string(), foreign_key, owner.to_string()],
        )?;
        Ok(())
    }

    fn list_records(&self, query: &RecordQuery) -> RepoResult<Vec<Record>> {
        let mut sql = format!("{RECORD_SELECT_SQL} WHERE {}", query.view.where_clause());
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(label) = &query.label {
            sql.push_str(" AND r.label = ?");
            bind_values.push(Value::Text(label.clone()));
        }

        sql.push_str(RECORD_ORDER_SQL);

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn related_records(
        &self,
        owner: RecordId,
        edge: &CascadeEdge,
        view: RecordView,
    ) -> RepoResult<Vec<Record>> {
        let sql = format!(
            "{RECORD_SELECT_SQL}
             INNER JOIN record_links AS l ON l.record_id = r.id
             WHERE l.owner_id = ?1
               AND l.foreign_key = ?2
               AND r.label = ?3
               AND {}{RECORD_ORDER_SQL};",
            view.where_clause()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![
            owner.to_string(),
            edge.foreign_key.as_str(),
            edge.related_label.as_str(),
        ])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<Record> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{id_text}` in records.id"))
    })?;

    let status_code: i64 = row.get("status")?;
    let status = RecordStatus::from_code(status_code).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status code `{status_code}` in records.status"
        ))
    })?;

    let record = Record {
        id,
        label: row.get("label")?,
        display: row.get("display")?,
        status,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    record.validate()?;
    Ok(record)
}
