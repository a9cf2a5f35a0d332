//! Record and field value types.
//!
//! # Invariants
//! - `id` is the only primary key column and is always an integer.
//! - `persisted` is true only after the record store inserted or loaded it.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Integer primary key shared by every entity table.
pub type RecordId = i64;

/// Attribute name that addresses [`Record::id`].
pub const PRIMARY_KEY: &str = "id";

/// One column value of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Short type label used in logs and errors. Never includes the value.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Self::Null => ValueRef::Null,
            Self::Integer(value) => ValueRef::Integer(*value),
            Self::Real(value) => ValueRef::Real(*value),
            Self::Text(value) => ValueRef::Text(value.as_bytes()),
            Self::Blob(value) => ValueRef::Blob(value.as_slice()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(value) => Ok(Self::Integer(value)),
            ValueRef::Real(value) => Ok(Self::Real(value)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|text| Self::Text(text.to_string()))
                .map_err(|err| FromSqlError::Other(Box::new(err))),
            ValueRef::Blob(bytes) => Ok(Self::Blob(bytes.to_vec())),
        }
    }
}

/// Attribute write rejected by the record model.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeError {
    /// `id` only accepts integer or null values.
    InvalidPrimaryKey { entity: String, kind: &'static str },
    EmptyName { entity: String },
}

impl Display for AttributeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPrimaryKey { entity, kind } => write!(
                f,
                "primary key of `{entity}` must be an integer, got {kind} value"
            ),
            Self::EmptyName { entity } => {
                write!(f, "attribute name for `{entity}` cannot be empty")
            }
        }
    }
}

impl Error for AttributeError {}

/// One persistent row of an entity type.
///
/// Attribute storage is keyed by column name; the primary key lives in
/// `id` and is reachable through [`PRIMARY_KEY`] as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    entity: String,
    id: Option<RecordId>,
    attributes: BTreeMap<String, FieldValue>,
    #[serde(default)]
    persisted: bool,
}

impl Record {
    /// Creates an unsaved record of `entity` with no attributes.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id: None,
            attributes: BTreeMap::new(),
            persisted: false,
        }
    }

    /// Builds a record from stored state. Used by record store implementations.
    pub fn loaded(
        entity: impl Into<String>,
        id: RecordId,
        attributes: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            entity: entity.into(),
            id: Some(id),
            attributes,
            persisted: true,
        }
    }

    /// Builder-style attribute write for fixtures and seeding.
    ///
    /// Debug builds panic on a rejected write; release builds leave the
    /// record unchanged. Use [`Record::write_attribute`] for checked writes.
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        let result = self.write_attribute(name, value);
        debug_assert!(
            result.is_ok(),
            "rejected fixture attribute `{name}`: {result:?}"
        );
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_new_record(&self) -> bool {
        !self.persisted
    }

    /// Marks the record as stored under `id`.
    pub fn mark_persisted(&mut self, id: RecordId) {
        self.id = Some(id);
        self.persisted = true;
    }

    /// Marks the record as no longer stored. Its attributes stay readable.
    pub fn mark_destroyed(&mut self) {
        self.persisted = false;
    }

    /// Reads one attribute. `None` means the attribute was never set.
    pub fn read_attribute(&self, name: &str) -> Option<FieldValue> {
        if name == PRIMARY_KEY {
            return self.id.map(FieldValue::Integer);
        }
        self.attributes.get(name).cloned()
    }

    /// Writes one attribute, bypassing any host-level write restrictions.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    /// - `InvalidPrimaryKey` when writing a non-integer value to `id`.
    pub fn write_attribute(
        &mut self,
        name: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), AttributeError> {
        if name.trim().is_empty() {
            return Err(AttributeError::EmptyName {
                entity: self.entity.clone(),
            });
        }

        let value = value.into();
        if name == PRIMARY_KEY {
            self.id = match value {
                FieldValue::Null => None,
                FieldValue::Integer(id) => Some(id),
                other => {
                    return Err(AttributeError::InvalidPrimaryKey {
                        entity: self.entity.clone(),
                        kind: other.kind(),
                    })
                }
            };
            return Ok(());
        }

        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Non-key attributes in column-name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}
