//! Lifecycle host binding a record store to sync policies.
//!
//! # Responsibility
//! - Persist records and run their after-save/after-destroy hooks.
//! - Configure one sync policy per master type and expose its operations.
//!
//! # Invariants
//! - Policies are opt-in per master type and immutable once configured.
//! - Hooks run inline after the record's own write; their errors are
//!   returned as errors of the save/destroy call.
//! - Slave writes issued by hooks go to the store directly and do not
//!   trigger the slave type's own hooks.

use crate::config::SyncDeclaration;
use crate::model::record::{Record, RecordId};
use crate::repo::record_repo::RecordStore;
use crate::schema::registry::{EntityRegistry, EntityType};
use crate::sync::error::{SyncConfigError, SyncError, SyncResult};
use crate::sync::hooks::{HookRegistry, LifecycleHook};
use crate::sync::operations::{OperationOutcome, OperationTable};
use crate::sync::policy::{SyncOptions, SyncPolicy};
use log::{debug, error};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Record store plus the entity types, hooks and policies acting on it.
pub struct ModelSession<S: RecordStore> {
    store: S,
    entities: EntityRegistry,
    hooks: HookRegistry,
    policies: BTreeMap<String, Arc<SyncPolicy>>,
}

impl<S: RecordStore> ModelSession<S> {
    pub fn new(store: S, entities: EntityRegistry) -> Self {
        Self {
            store,
            entities,
            hooks: HookRegistry::new(),
            policies: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Attaches `hook` to the lifecycle of `entity` records.
    pub fn register_hook(
        &mut self,
        entity: &str,
        hook: Arc<dyn LifecycleHook>,
    ) -> Result<(), SyncConfigError> {
        let entity = self
            .entities
            .resolve(entity)
            .ok_or_else(|| SyncConfigError::UnknownMasterType(entity.trim().to_string()))?
            .name()
            .to_string();
        debug!(
            "event=hook_register module=session status=ok entity={entity} hook={}",
            hook.hook_name()
        );
        self.hooks.register(&entity, hook);
        Ok(())
    }

    /// Configures one-way sync for `master_type` and registers its save and
    /// destroy hooks.
    ///
    /// # Errors
    /// - `UnknownMasterType` when the master is not registered.
    /// - `AlreadyConfigured` on a second call for the same master type.
    /// - Any validation error from [`SyncPolicy::configure`].
    pub fn model_sync(
        &mut self,
        master_type: &str,
        options: SyncOptions,
    ) -> Result<Arc<SyncPolicy>, SyncConfigError> {
        let master = self
            .entities
            .resolve(master_type)
            .ok_or_else(|| SyncConfigError::UnknownMasterType(master_type.trim().to_string()))?
            .clone();
        if self.policies.contains_key(master.name()) {
            return Err(SyncConfigError::AlreadyConfigured(master.name().to_string()));
        }

        let policy = Arc::new(SyncPolicy::configure(&master, options, &self.entities)?);
        self.hooks.register(master.name(), policy.clone());
        self.policies
            .insert(master.name().to_string(), Arc::clone(&policy));
        Ok(policy)
    }

    /// Configures every declaration in order, stopping at the first error.
    pub fn apply_declarations(
        &mut self,
        declarations: impl IntoIterator<Item = SyncDeclaration>,
    ) -> Result<Vec<Arc<SyncPolicy>>, SyncConfigError> {
        declarations
            .into_iter()
            .map(|declaration| {
                let master = declaration.master.clone();
                self.model_sync(&master, declaration.into_options())
            })
            .collect()
    }

    pub fn policy(&self, master_type: &str) -> Option<&Arc<SyncPolicy>> {
        let entity = self.entities.resolve(master_type)?;
        self.policies.get(entity.name())
    }

    /// Named operations available on records of `master_type`.
    pub fn operations(&self, master_type: &str) -> Option<&OperationTable> {
        self.policy(master_type).map(|policy| policy.operations())
    }

    pub fn find(&self, entity: &str, id: RecordId) -> SyncResult<Option<Record>> {
        let entity = self.entity(entity)?;
        Ok(self.store.find(entity, id)?)
    }

    /// Persists `record`, then runs its after-save hooks.
    pub fn save(&self, record: &mut Record) -> SyncResult<()> {
        let entity = self.entity(record.entity())?;
        self.store.save(entity, record)?;
        self.hooks
            .run_after_save(&self.store, record)
            .inspect_err(|err| log_hook_failure("after_save", record, err))
    }

    /// Deletes `record`, then runs its after-destroy hooks.
    pub fn destroy(&self, record: &mut Record) -> SyncResult<()> {
        let entity = self.entity(record.entity())?;
        self.store.destroy(entity, record)?;
        self.hooks
            .run_after_destroy(&self.store, record)
            .inspect_err(|err| log_hook_failure("after_destroy", record, err))
    }

    pub fn find_slave(&self, master: &Record) -> SyncResult<Option<Record>> {
        let policy = self.policy_for(master)?;
        Ok(policy.find_slave(&self.store, master)?)
    }

    pub fn create_slave(&self, master: &Record) -> SyncResult<Option<Record>> {
        self.policy_for(master)?.create_slave(&self.store, master)
    }

    pub fn is_synced_with_slave(&self, master: &Record) -> SyncResult<bool> {
        self.policy_for(master)?
            .is_synced_with_slave(&self.store, master)
    }

    /// Dispatches a named operation such as `create_widget` on `master`.
    ///
    /// # Errors
    /// - `NoSuchOperation` when the master type has no policy or the name
    ///   is not in its operation table.
    pub fn invoke(&self, master: &Record, operation: &str) -> SyncResult<OperationOutcome> {
        match self.policy(master.entity()) {
            Some(policy) => policy.invoke(&self.store, master, operation),
            None => Err(SyncError::NoSuchOperation {
                entity: master.entity().to_string(),
                operation: operation.to_string(),
            }),
        }
    }

    fn entity(&self, name: &str) -> SyncResult<&EntityType> {
        self.entities
            .resolve(name)
            .ok_or_else(|| SyncError::UnknownEntity(name.to_string()))
    }

    fn policy_for(&self, master: &Record) -> SyncResult<&Arc<SyncPolicy>> {
        self.policy(master.entity())
            .ok_or_else(|| SyncError::NotConfigured(master.entity().to_string()))
    }
}

fn log_hook_failure(stage: &str, record: &Record, err: &SyncError) {
    error!(
        "event=hook_run module=session status=error stage={stage} entity={} id={} error={}",
        record.entity(),
        record.id().map_or_else(|| "none".to_string(), |id| id.to_string()),
        err
    );
}
