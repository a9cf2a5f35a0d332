//! Entity type registry.
//!
//! Stands in for the host framework's class lookup: a lowercase entity name
//! resolves to an [`EntityType`] handle used to construct and query records.

use crate::schema::inflect::{is_valid_identifier, pluralize, singularize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registration errors for entity types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRegistryError {
    InvalidEntityName(String),
    InvalidTableName(String),
    DuplicateEntity(String),
}

impl Display for EntityRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEntityName(value) => write!(f, "entity name is invalid: {value}"),
            Self::InvalidTableName(value) => write!(f, "table name is invalid: {value}"),
            Self::DuplicateEntity(value) => write!(f, "entity already registered: {value}"),
        }
    }
}

impl Error for EntityRegistryError {}

/// Resolved handle for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    name: String,
    table: String,
}

impl EntityType {
    /// Declares an entity backed by the conventional plural table name.
    pub fn new(name: &str) -> Result<Self, EntityRegistryError> {
        let name = normalize_name(name);
        let table = pluralize(&name);
        Self::with_table(&name, &table)
    }

    /// Declares an entity backed by an explicit table name.
    pub fn with_table(name: &str, table: &str) -> Result<Self, EntityRegistryError> {
        let name = normalize_name(name);
        if !is_valid_identifier(&name) {
            return Err(EntityRegistryError::InvalidEntityName(name));
        }
        let table = table.trim();
        if !is_valid_identifier(table) {
            return Err(EntityRegistryError::InvalidTableName(table.to_string()));
        }
        Ok(Self {
            name,
            table: table.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

/// Runtime registry of entity types known to one session.
#[derive(Debug, Default, Clone)]
pub struct EntityRegistry {
    entities: BTreeMap<String, EntityType>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one entity type under its singular name.
    pub fn register(&mut self, entity: EntityType) -> Result<(), EntityRegistryError> {
        let key = singularize(entity.name());
        if self.entities.contains_key(&key) {
            return Err(EntityRegistryError::DuplicateEntity(key));
        }
        self.entities.insert(key, entity);
        Ok(())
    }

    /// Resolves a name by the classify convention.
    ///
    /// Input is trimmed and lowercased; both `widget` and `widgets` resolve
    /// to the entity registered as `widget`.
    pub fn resolve(&self, name: &str) -> Option<&EntityType> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }
        self.entities
            .get(&normalized)
            .or_else(|| self.entities.get(&singularize(&normalized)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns sorted entity names.
    pub fn names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
