//! One-way master-to-slave record synchronization over SQLite.
//!
//! A master entity type opts into a [`SyncPolicy`] through
//! [`ModelSession::model_sync`]. Saving a master copies its mapped fields
//! onto the slave located by a single foreign-key pair; destroying a master
//! destroys that slave. Slave creation is explicit (`create_<slave>`).

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schema;
pub mod session;
pub mod sync;

pub use config::{load_declarations, parse_declarations, DeclarationError, SyncDeclaration};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::record::{AttributeError, FieldValue, Record, RecordId, PRIMARY_KEY};
pub use repo::record_repo::{RecordStore, RepoError, RepoResult, SqliteRecordStore};
pub use schema::registry::{EntityRegistry, EntityRegistryError, EntityType};
pub use session::ModelSession;
pub use sync::error::{SyncConfigError, SyncError, SyncResult};
pub use sync::hooks::{HookRegistry, LifecycleHook};
pub use sync::operations::{OperationOutcome, OperationTable, SlaveOperation};
pub use sync::policy::{CustomMapper, FieldMapping, Relationship, SyncOptions, SyncPolicy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
