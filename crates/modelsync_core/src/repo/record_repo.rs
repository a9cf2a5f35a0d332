//! Record store contract and SQLite-backed implementation.
//!
//! # Responsibility
//! - Provide find/find-first/save/destroy over any registered entity table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `save` inserts unsaved records and updates persisted ones.
//! - Inserting a record with a preset `id` keeps that id.
//! - `find_first` matches by equality on one bound value and returns the
//!   row with the lowest `id` when several rows match.

use crate::db::DbError;
use crate::model::record::{FieldValue, Record, RecordId, PRIMARY_KEY};
use crate::schema::inflect::is_valid_identifier;
use crate::schema::registry::EntityType;
use log::debug;
use rusqlite::{params_from_iter, Connection, Row, Statement};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidIdentifier(String),
    EntityMismatch { expected: String, actual: String },
    MissingId(String),
    NotFound { entity: String, id: RecordId },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidIdentifier(value) => write!(f, "invalid sql identifier `{value}`"),
            Self::EntityMismatch { expected, actual } => write!(
                f,
                "record of `{actual}` cannot be stored as `{expected}`"
            ),
            Self::MissingId(entity) => write!(f, "`{entity}` record has no id"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
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

/// Persistence primitives consumed by synchronization.
pub trait RecordStore {
    /// Loads one record by primary key.
    fn find(&self, entity: &EntityType, id: RecordId) -> RepoResult<Option<Record>>;
    /// Loads the first record whose `field` equals `value`.
    fn find_first(
        &self,
        entity: &EntityType,
        field: &str,
        value: &FieldValue,
    ) -> RepoResult<Option<Record>>;
    /// Inserts or updates `record` and marks it persisted.
    fn save(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()>;
    /// Deletes `record` by primary key and marks it destroyed.
    fn destroy(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()>;
}

/// SQLite-backed record store.
///
/// Works on a plain `Connection` or, through deref, on an open
/// `rusqlite::Transaction` when the caller wants master and slave writes to
/// commit together.
pub struct SqliteRecordStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn insert(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()> {
        let table = quote_ident(entity.table())?;
        let mut columns = Vec::new();
        let mut values = Vec::new();

        if let Some(id) = record.id() {
            columns.push(quote_ident(PRIMARY_KEY)?);
            values.push(FieldValue::Integer(id));
        }
        for (name, value) in record.attributes() {
            columns.push(quote_ident(name)?);
            values.push(value.clone());
        }

        if columns.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {table} DEFAULT VALUES;"), [])?;
        } else {
            let placeholders = (1..=columns.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>()
                .join(", ");
            self.conn.execute(
                &format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders});",
                    columns.join(", ")
                ),
                params_from_iter(values.iter()),
            )?;
        }

        let id = record.id().unwrap_or_else(|| self.conn.last_insert_rowid());
        record.mark_persisted(id);
        debug!(
            "event=record_insert module=repo status=ok entity={} id={id}",
            entity.name()
        );
        Ok(())
    }

    fn update(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()> {
        let id = record
            .id()
            .ok_or_else(|| RepoError::MissingId(entity.name().to_string()))?;
        let table = quote_ident(entity.table())?;

        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (index, (name, value)) in record.attributes().enumerate() {
            assignments.push(format!("{} = ?{}", quote_ident(name)?, index + 1));
            values.push(value.clone());
        }
        values.push(FieldValue::Integer(id));

        let changed = if assignments.is_empty() {
            let count = self.conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {table} WHERE {} = ?1;",
                    quote_ident(PRIMARY_KEY)?
                ),
                [id],
                |row| row.get::<_, i64>(0),
            )?;
            usize::from(count > 0)
        } else {
            self.conn.execute(
                &format!(
                    "UPDATE {table} SET {} WHERE {} = ?{};",
                    assignments.join(", "),
                    quote_ident(PRIMARY_KEY)?,
                    values.len()
                ),
                params_from_iter(values.iter()),
            )?
        };

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: entity.name().to_string(),
                id,
            });
        }

        debug!(
            "event=record_update module=repo status=ok entity={} id={id}",
            entity.name()
        );
        Ok(())
    }

    fn query_one(
        &self,
        entity: &EntityType,
        sql: &str,
        value: &FieldValue,
    ) -> RepoResult<Option<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns = column_names(&stmt);
        let mut rows = stmt.query([value])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(entity, &columns, row)?));
        }
        Ok(None)
    }
}

impl RecordStore for SqliteRecordStore<'_> {
    fn find(&self, entity: &EntityType, id: RecordId) -> RepoResult<Option<Record>> {
        self.find_first(entity, PRIMARY_KEY, &FieldValue::Integer(id))
    }

    fn find_first(
        &self,
        entity: &EntityType,
        field: &str,
        value: &FieldValue,
    ) -> RepoResult<Option<Record>> {
        let table = quote_ident(entity.table())?;
        let column = quote_ident(field)?;
        let key = quote_ident(PRIMARY_KEY)?;
        let sql = format!("SELECT * FROM {table} WHERE {column} = ?1 ORDER BY {key} ASC LIMIT 1;");
        self.query_one(entity, &sql, value)
    }

    fn save(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()> {
        ensure_entity(entity, record)?;
        if record.is_persisted() {
            self.update(entity, record)
        } else {
            self.insert(entity, record)
        }
    }

    fn destroy(&self, entity: &EntityType, record: &mut Record) -> RepoResult<()> {
        ensure_entity(entity, record)?;
        let id = record
            .id()
            .ok_or_else(|| RepoError::MissingId(entity.name().to_string()))?;

        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quote_ident(entity.table())?,
                quote_ident(PRIMARY_KEY)?
            ),
            [id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: entity.name().to_string(),
                id,
            });
        }

        record.mark_destroyed();
        debug!(
            "event=record_destroy module=repo status=ok entity={} id={id}",
            entity.name()
        );
        Ok(())
    }
}

fn ensure_entity(entity: &EntityType, record: &Record) -> RepoResult<()> {
    if record.entity() != entity.name() {
        return Err(RepoError::EntityMismatch {
            expected: entity.name().to_string(),
            actual: record.entity().to_string(),
        });
    }
    Ok(())
}

fn quote_ident(name: &str) -> RepoResult<String> {
    if !is_valid_identifier(name) {
        return Err(RepoError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn parse_record_row(entity: &EntityType, columns: &[String], row: &Row<'_>) -> RepoResult<Record> {
    let mut id = None;
    let mut attributes = BTreeMap::new();

    for (index, column) in columns.iter().enumerate() {
        let value: FieldValue = row.get(index)?;
        if column == PRIMARY_KEY {
            id = Some(value.as_integer().ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "non-integer {} value in {}.{PRIMARY_KEY}",
                    value.kind(),
                    entity.table()
                ))
            })?);
        } else {
            attributes.insert(column.clone(), value);
        }
    }

    let id = id.ok_or_else(|| {
        RepoError::InvalidData(format!(
            "table `{}` has no `{PRIMARY_KEY}` column",
            entity.table()
        ))
    })?;
    Ok(Record::loaded(entity.name(), id, attributes))
}
