//! Lifecycle hooks and the sync policy's save/destroy handlers.
//!
//! # Responsibility
//! - Define the after-save/after-destroy hook contract.
//! - Keep an explicit per-entity hook list instead of global registration.
//!
//! # Invariants
//! - Hooks run after the record's own write has completed.
//! - Hooks of one entity run in registration order.
//! - A hook error aborts the remaining hooks and is returned to the caller.

use crate::model::record::Record;
use crate::repo::record_repo::RecordStore;
use crate::sync::error::SyncResult;
use crate::sync::policy::SyncPolicy;
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Callback contract run around a record's persistence lifecycle.
pub trait LifecycleHook {
    /// Stable label used in logs.
    fn hook_name(&self) -> &str;

    fn after_save(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        let _ = (store, record);
        Ok(())
    }

    fn after_destroy(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        let _ = (store, record);
        Ok(())
    }
}

/// Hook lists keyed by entity name.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Vec<Arc<dyn LifecycleHook>>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: &str, hook: Arc<dyn LifecycleHook>) {
        self.hooks.entry(entity.to_string()).or_default().push(hook);
    }

    /// Hooks for `entity` in registration order.
    pub fn hooks_for(&self, entity: &str) -> &[Arc<dyn LifecycleHook>] {
        self.hooks.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn run_after_save(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        for hook in self.hooks_for(record.entity()) {
            hook.after_save(store, record)?;
        }
        Ok(())
    }

    pub fn run_after_destroy(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        for hook in self.hooks_for(record.entity()) {
            hook.after_destroy(store, record)?;
        }
        Ok(())
    }
}

impl SyncPolicy {
    /// Save handler: syncs and persists an existing slave.
    ///
    /// Returns whether a slave was found. A missing slave is left missing;
    /// creation only happens through [`SyncPolicy::create_slave`].
    pub fn sync_changes(&self, store: &dyn RecordStore, master: &Record) -> SyncResult<bool> {
        let Some(mut slave) = self.find_slave(store, master)? else {
            return Ok(false);
        };

        self.sync(master, &mut slave)?;
        store.save(&self.slave_type, &mut slave)?;
        info!(
            "event=slave_sync module=sync status=ok master={} master_id={} slave={} slave_id={}",
            self.master_type.name(),
            display_id(master),
            self.slave_type.name(),
            display_id(&slave)
        );
        Ok(true)
    }

    /// Destroy handler: removes the located slave, one level only.
    ///
    /// Returns whether a slave was destroyed.
    pub fn destroy_slave(&self, store: &dyn RecordStore, master: &Record) -> SyncResult<bool> {
        let Some(mut slave) = self.find_slave(store, master)? else {
            return Ok(false);
        };

        let slave_id = display_id(&slave);
        store.destroy(&self.slave_type, &mut slave)?;
        info!(
            "event=slave_destroy module=sync status=ok master={} master_id={} slave={} slave_id={}",
            self.master_type.name(),
            display_id(master),
            self.slave_type.name(),
            slave_id
        );
        Ok(true)
    }
}

impl LifecycleHook for SyncPolicy {
    fn hook_name(&self) -> &str {
        "model_sync"
    }

    fn after_save(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        self.sync_changes(store, record).map(|_| ())
    }

    fn after_destroy(&self, store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        self.destroy_slave(store, record).map(|_| ())
    }
}

pub(crate) fn display_id(record: &Record) -> String {
    record
        .id()
        .map_or_else(|| "none".to_string(), |id| id.to_string())
}
