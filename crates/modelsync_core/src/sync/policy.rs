//! Sync policy configuration.
//!
//! # Responsibility
//! - Validate sync options against the entity registry at configure time.
//! - Hold the resolved slave type, key pair, field mapping and mapper.
//!
//! # Invariants
//! - An unresolvable slave type is a configuration error, never deferred.
//! - Exactly one relationship key pair; zero or several are rejected.
//! - Field mapping keeps declaration order.

use crate::model::record::{AttributeError, Record, PRIMARY_KEY};
use crate::schema::inflect::is_valid_identifier;
use crate::schema::registry::{EntityRegistry, EntityType};
use crate::sync::error::SyncConfigError;
use crate::sync::operations::OperationTable;
use log::info;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Extra copy/transform step run after field mapping.
pub type MappingFn = dyn Fn(&Record, &mut Record) -> Result<(), AttributeError> + Send + Sync;

/// Shared handle to a custom mapping function.
pub type CustomMapper = Arc<MappingFn>;

/// Master field holding the foreign key and the slave field it must equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub master_key: String,
    pub slave_key: String,
}

/// One master-to-slave column copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: String,
    pub dest: String,
}

/// Caller-facing sync options, validated by [`SyncPolicy::configure`].
#[derive(Clone, Default)]
pub struct SyncOptions {
    pub sync_to: String,
    pub relationship: Vec<(String, String)>,
    pub mappings: Vec<(String, String)>,
    pub mapping_fn: Option<CustomMapper>,
}

impl SyncOptions {
    pub fn new(sync_to: impl Into<String>) -> Self {
        Self {
            sync_to: sync_to.into(),
            ..Self::default()
        }
    }

    /// Adds a relationship key pair. Only one pair is accepted at configure time.
    pub fn relationship(mut self, master_key: impl Into<String>, slave_key: impl Into<String>) -> Self {
        self.relationship.push((master_key.into(), slave_key.into()));
        self
    }

    /// Appends a field mapping; later entries win for a shared destination.
    pub fn map(mut self, source: impl Into<String>, dest: impl Into<String>) -> Self {
        self.mappings.push((source.into(), dest.into()));
        self
    }

    pub fn with_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Record, &mut Record) -> Result<(), AttributeError> + Send + Sync + 'static,
    {
        self.mapping_fn = Some(Arc::new(mapper));
        self
    }
}

impl Debug for SyncOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOptions")
            .field("sync_to", &self.sync_to)
            .field("relationship", &self.relationship)
            .field("mappings", &self.mappings)
            .field("mapping_fn", &self.mapping_fn.is_some())
            .finish()
    }
}

/// Resolved, immutable sync policy of one master entity type.
pub struct SyncPolicy {
    pub(crate) master_type: EntityType,
    pub(crate) slave_type_name: String,
    pub(crate) slave_type: EntityType,
    pub(crate) relationship: Relationship,
    pub(crate) field_mapping: Vec<FieldMapping>,
    pub(crate) custom_mapper: Option<CustomMapper>,
    pub(crate) operations: OperationTable,
}

impl SyncPolicy {
    /// Validates `options` for `master_type` and resolves the slave type.
    ///
    /// # Errors
    /// - `UnknownSlaveType` when `sync_to` does not resolve in `registry`.
    /// - `MissingRelationship` / `MultipleRelationshipPairs` unless exactly
    ///   one key pair is supplied.
    /// - `InvalidFieldName` when a key or mapped field is not a valid column name.
    /// - `PrimaryKeyDestination` when a mapping writes the slave `id`; the
    ///   slave id is only ever set by `create_slave`.
    pub fn configure(
        master_type: &EntityType,
        options: SyncOptions,
        registry: &EntityRegistry,
    ) -> Result<Self, SyncConfigError> {
        let slave_type_name = options.sync_to.trim().to_ascii_lowercase();
        let slave_type = registry
            .resolve(&slave_type_name)
            .cloned()
            .ok_or_else(|| SyncConfigError::UnknownSlaveType(slave_type_name.clone()))?;

        let relationship = match options.relationship.as_slice() {
            [] => return Err(SyncConfigError::MissingRelationship),
            [(master_key, slave_key)] => Relationship {
                master_key: validated_field(master_key)?,
                slave_key: validated_field(slave_key)?,
            },
            pairs => return Err(SyncConfigError::MultipleRelationshipPairs(pairs.len())),
        };

        let field_mapping = options
            .mappings
            .iter()
            .map(|(source, dest)| {
                let source = validated_field(source)?;
                let dest = validated_field(dest)?;
                if dest == PRIMARY_KEY {
                    return Err(SyncConfigError::PrimaryKeyDestination(source));
                }
                Ok(FieldMapping { source, dest })
            })
            .collect::<Result<Vec<_>, SyncConfigError>>()?;

        let operations = OperationTable::for_slave(&slave_type_name);

        info!(
            "event=sync_configure module=sync status=ok master={} slave={} master_key={} slave_key={} mappings={} mapper={}",
            master_type.name(),
            slave_type.name(),
            relationship.master_key,
            relationship.slave_key,
            field_mapping.len(),
            options.mapping_fn.is_some()
        );

        Ok(Self {
            master_type: master_type.clone(),
            slave_type_name,
            slave_type,
            relationship,
            field_mapping,
            custom_mapper: options.mapping_fn,
            operations,
        })
    }

    pub fn master_type(&self) -> &EntityType {
        &self.master_type
    }

    /// Lowercased `sync_to` name as configured; names the slave operations.
    pub fn slave_type_name(&self) -> &str {
        &self.slave_type_name
    }

    pub fn slave_type(&self) -> &EntityType {
        &self.slave_type
    }

    pub fn relationship(&self) -> &Relationship {
        &self.relationship
    }

    pub fn field_mapping(&self) -> &[FieldMapping] {
        &self.field_mapping
    }

    pub fn has_custom_mapper(&self) -> bool {
        self.custom_mapper.is_some()
    }

    pub fn operations(&self) -> &OperationTable {
        &self.operations
    }
}

impl Debug for SyncPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPolicy")
            .field("master_type", &self.master_type)
            .field("slave_type_name", &self.slave_type_name)
            .field("slave_type", &self.slave_type)
            .field("relationship", &self.relationship)
            .field("field_mapping", &self.field_mapping)
            .field("custom_mapper", &self.custom_mapper.is_some())
            .finish()
    }
}

fn validated_field(name: &str) -> Result<String, SyncConfigError> {
    let trimmed = name.trim();
    if !is_valid_identifier(trimmed) {
        return Err(SyncConfigError::InvalidFieldName(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}
