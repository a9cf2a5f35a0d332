//! Slave record lookup.
//!
//! # Invariants
//! - A missing or null foreign key means "no slave" and issues no query.
//! - Every lookup re-queries the store; nothing is cached.

use crate::model::record::Record;
use crate::repo::record_repo::{RecordStore, RepoResult};
use crate::sync::policy::SyncPolicy;
use log::debug;

impl SyncPolicy {
    /// Finds at most one slave record for `master`.
    ///
    /// Matches by equality of `relationship.slave_key` with the master's
    /// foreign key value. When several slaves match, the store decides which
    /// one is returned (the SQLite store picks the lowest id).
    pub fn find_slave(&self, store: &dyn RecordStore, master: &Record) -> RepoResult<Option<Record>> {
        let foreign_key = match master.read_attribute(&self.relationship.master_key) {
            Some(value) if !value.is_null() => value,
            _ => {
                debug!(
                    "event=slave_lookup module=sync status=skipped master={} slave={} reason=no_foreign_key",
                    self.master_type.name(),
                    self.slave_type.name()
                );
                return Ok(None);
            }
        };

        let slave = store.find_first(&self.slave_type, &self.relationship.slave_key, &foreign_key)?;
        debug!(
            "event=slave_lookup module=sync status=ok master={} slave={} found={}",
            self.master_type.name(),
            self.slave_type.name(),
            slave.is_some()
        );
        Ok(slave)
    }
}
