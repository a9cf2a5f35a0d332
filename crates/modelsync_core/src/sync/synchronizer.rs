//! Field copy from master to slave.

use crate::model::record::{AttributeError, FieldValue, Record};
use crate::sync::policy::SyncPolicy;

impl SyncPolicy {
    /// Copies mapped fields from `master` onto `slave`, then runs the custom
    /// mapper if one is configured.
    ///
    /// Mappings apply in declaration order, so the last mapping wins for a
    /// shared destination. An unset master field is written as null. The
    /// slave is only mutated in memory.
    pub fn sync(&self, master: &Record, slave: &mut Record) -> Result<(), AttributeError> {
        for mapping in &self.field_mapping {
            let value = master
                .read_attribute(&mapping.source)
                .unwrap_or(FieldValue::Null);
            slave.write_attribute(&mapping.dest, value)?;
        }

        if let Some(mapper) = &self.custom_mapper {
            mapper(master, slave)?;
        }

        Ok(())
    }
}
