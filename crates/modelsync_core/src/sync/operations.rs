//! Named slave operations bound per configured policy.
//!
//! A policy syncing to `widget` answers to `create_widget`,
//! `synced_with_widget?` and the `synched_with_widget?` spelling. The table
//! is fixed when the policy is configured; any other name is rejected.

use crate::model::record::Record;
use crate::repo::record_repo::RecordStore;
use crate::sync::error::{SyncError, SyncResult};
use crate::sync::hooks::display_id;
use crate::sync::policy::SyncPolicy;
use log::info;
use std::collections::BTreeMap;

/// Operation kinds exposed for a configured slave type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveOperation {
    CreateSlave,
    IsSyncedWithSlave,
}

/// Result of a dispatched slave operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// `Some` carries the new slave; `None` means one already existed.
    Created(Option<Record>),
    Synced(bool),
}

/// Operation names registered for one slave type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTable {
    entries: BTreeMap<String, SlaveOperation>,
}

impl OperationTable {
    pub fn for_slave(slave_type_name: &str) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            format!("create_{slave_type_name}"),
            SlaveOperation::CreateSlave,
        );
        for tense in ["synced", "synched"] {
            entries.insert(
                format!("{tense}_with_{slave_type_name}?"),
                SlaveOperation::IsSyncedWithSlave,
            );
        }
        Self { entries }
    }

    /// Exact-name lookup; no pattern matching.
    pub fn lookup(&self, name: &str) -> Option<SlaveOperation> {
        self.entries.get(name).copied()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl SyncPolicy {
    /// Creates the slave for `master` unless one already exists.
    ///
    /// The new slave receives the mapped fields and the master's id as its
    /// own primary key. An existing slave is left untouched.
    pub fn create_slave(&self, store: &dyn RecordStore, master: &Record) -> SyncResult<Option<Record>> {
        if let Some(existing) = self.find_slave(store, master)? {
            info!(
                "event=slave_create module=sync status=skipped master={} master_id={} slave={} slave_id={} reason=exists",
                self.master_type.name(),
                display_id(master),
                self.slave_type.name(),
                display_id(&existing)
            );
            return Ok(None);
        }

        let mut slave = Record::new(self.slave_type.name());
        self.sync(master, &mut slave)?;
        slave.set_id(master.id());
        store.save(&self.slave_type, &mut slave)?;

        info!(
            "event=slave_create module=sync status=ok master={} master_id={} slave={} slave_id={}",
            self.master_type.name(),
            display_id(master),
            self.slave_type.name(),
            display_id(&slave)
        );
        Ok(Some(slave))
    }

    /// Returns whether a slave is currently found for `master`.
    pub fn is_synced_with_slave(&self, store: &dyn RecordStore, master: &Record) -> SyncResult<bool> {
        Ok(self.find_slave(store, master)?.is_some())
    }

    /// Dispatches one named operation from this policy's table.
    ///
    /// # Errors
    /// - `NoSuchOperation` for any name outside the table.
    pub fn invoke(
        &self,
        store: &dyn RecordStore,
        master: &Record,
        operation: &str,
    ) -> SyncResult<OperationOutcome> {
        match self.operations.lookup(operation) {
            Some(SlaveOperation::CreateSlave) => {
                self.create_slave(store, master).map(OperationOutcome::Created)
            }
            Some(SlaveOperation::IsSyncedWithSlave) => self
                .is_synced_with_slave(store, master)
                .map(OperationOutcome::Synced),
            None => Err(SyncError::NoSuchOperation {
                entity: self.master_type.name().to_string(),
                operation: operation.to_string(),
            }),
        }
    }
}
