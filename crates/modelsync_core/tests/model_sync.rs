use modelsync_core::db::{open_db_in_memory, Migration};
use modelsync_core::{
    EntityRegistry, EntityType, FieldValue, LifecycleHook, ModelSession, OperationOutcome, Record,
    RecordStore, RepoError, SqliteRecordStore, SyncConfigError, SyncError, SyncOptions,
    SyncResult,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

const SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT,
        email TEXT,
        profile_ref INTEGER
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY,
        user_id INTEGER,
        display_name TEXT NOT NULL,
        contact TEXT
    );",
)];

fn entities() -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    registry.register(EntityType::new("user").unwrap()).unwrap();
    registry.register(EntityType::new("profile").unwrap()).unwrap();
    registry
}

fn profile_options() -> SyncOptions {
    SyncOptions::new("profile")
        .relationship("id", "user_id")
        .map("id", "user_id")
        .map("name", "display_name")
        .map("email", "contact")
}

fn synced_session(conn: &Connection) -> ModelSession<SqliteRecordStore<'_>> {
    let mut session = ModelSession::new(SqliteRecordStore::new(conn), entities());
    session.model_sync("user", profile_options()).unwrap();
    session
}

fn new_user(name: &str) -> Record {
    Record::new("user")
        .with("name", name)
        .with("email", format!("{}@example.com", name.to_lowercase()))
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn save_without_slave_does_not_create_one() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();

    assert!(user.is_persisted());
    assert_eq!(count(&conn, "profiles"), 0);
    assert!(!session.is_synced_with_slave(&user).unwrap());
}

#[test]
fn create_slave_shares_master_id_and_mapped_fields() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    let created = session.create_slave(&user).unwrap().expect("slave is created");

    assert_eq!(created.id(), user.id());
    let stored = session.find("profile", user.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.read_attribute("display_name"), Some(FieldValue::from("Ada")));
    assert_eq!(
        stored.read_attribute("contact"),
        Some(FieldValue::from("ada@example.com"))
    );
    assert_eq!(stored.read_attribute("user_id"), user.read_attribute("id"));
    assert!(session.is_synced_with_slave(&user).unwrap());
}

#[test]
fn create_slave_is_a_noop_when_slave_exists() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();
    conn.execute(
        "UPDATE profiles SET display_name = 'hand edited' WHERE id = ?1;",
        [user.id().unwrap()],
    )
    .unwrap();

    assert!(session.create_slave(&user).unwrap().is_none());
    let stored = session.find("profile", user.id().unwrap()).unwrap().unwrap();
    assert_eq!(
        stored.read_attribute("display_name"),
        Some(FieldValue::from("hand edited"))
    );
    assert_eq!(count(&conn, "profiles"), 1);
}

#[test]
fn saving_master_syncs_existing_slave() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();

    user.write_attribute("name", "Ada Lovelace").unwrap();
    session.save(&mut user).unwrap();

    let slave = session.find_slave(&user).unwrap().unwrap();
    assert_eq!(
        slave.read_attribute("display_name"),
        Some(FieldValue::from("Ada Lovelace"))
    );
}

#[test]
fn repeated_saves_leave_slave_unchanged() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Grace");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();

    session.save(&mut user).unwrap();
    let first = session.find_slave(&user).unwrap();
    session.save(&mut user).unwrap();
    let second = session.find_slave(&user).unwrap();

    assert_eq!(first, second);
    assert_eq!(count(&conn, "profiles"), 1);
}

#[test]
fn destroying_master_destroys_slave() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();
    let mut other = new_user("Grace");
    session.save(&mut other).unwrap();
    session.create_slave(&other).unwrap();

    session.destroy(&mut user).unwrap();

    assert_eq!(count(&conn, "users"), 1);
    assert_eq!(count(&conn, "profiles"), 1);
    assert!(session.is_synced_with_slave(&other).unwrap());
}

#[test]
fn destroying_master_without_slave_succeeds() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.destroy(&mut user).unwrap();

    assert_eq!(count(&conn, "users"), 0);
}

#[test]
fn null_foreign_key_means_unsynced() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), entities());
    session
        .model_sync(
            "user",
            SyncOptions::new("profile")
                .relationship("profile_ref", "id")
                .map("name", "display_name"),
        )
        .unwrap();

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();

    assert!(!session.is_synced_with_slave(&user).unwrap());
    assert!(session.find_slave(&user).unwrap().is_none());
    session.destroy(&mut user).unwrap();
}

#[test]
fn named_operations_dispatch_and_unknown_names_fail() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();

    assert_eq!(
        session.invoke(&user, "synced_with_profile?").unwrap(),
        OperationOutcome::Synced(false)
    );
    let created = session.invoke(&user, "create_profile").unwrap();
    assert!(matches!(created, OperationOutcome::Created(Some(_))));
    assert_eq!(
        session.invoke(&user, "synched_with_profile?").unwrap(),
        OperationOutcome::Synced(true)
    );
    assert_eq!(
        session.invoke(&user, "create_profile").unwrap(),
        OperationOutcome::Created(None)
    );

    let err = session.invoke(&user, "create_widget").unwrap_err();
    assert!(matches!(
        err,
        SyncError::NoSuchOperation { ref operation, .. } if operation == "create_widget"
    ));

    let names = session.operations("users").unwrap().names();
    assert!(names.contains(&"create_profile"));
}

#[test]
fn operations_on_unconfigured_type_are_rejected() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);
    let profile = Record::new("profile");

    assert!(matches!(
        session.invoke(&profile, "create_user"),
        Err(SyncError::NoSuchOperation { .. })
    ));
    assert!(matches!(
        session.create_slave(&profile),
        Err(SyncError::NotConfigured(_))
    ));
}

#[test]
fn configuration_errors_are_fatal_and_single_shot() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), entities());

    assert_eq!(
        session
            .model_sync("user", SyncOptions::new("widget").relationship("id", "user_id"))
            .unwrap_err(),
        SyncConfigError::UnknownSlaveType("widget".to_string())
    );
    assert_eq!(
        session.model_sync("account", profile_options()).unwrap_err(),
        SyncConfigError::UnknownMasterType("account".to_string())
    );

    session.model_sync("user", profile_options()).unwrap();
    assert_eq!(
        session.model_sync("users", profile_options()).unwrap_err(),
        SyncConfigError::AlreadyConfigured("user".to_string())
    );
}

#[test]
fn slave_persistence_failure_fails_master_save() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let session = synced_session(&conn);

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();

    user.write_attribute("name", FieldValue::Null).unwrap();
    let err = session.save(&mut user).unwrap_err();
    assert!(matches!(err, SyncError::Repo(RepoError::Db(_))));

    // The master write is not rolled back.
    let stored = session.find("user", user.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.read_attribute("name"), Some(FieldValue::Null));
}

#[test]
fn caller_transaction_keeps_master_and_slave_consistent() {
    let mut conn = open_db_in_memory(SCHEMA).unwrap();
    let user_id = {
        let session = synced_session(&conn);
        let mut user = new_user("Ada");
        session.save(&mut user).unwrap();
        session.create_slave(&user).unwrap();
        user.id().unwrap()
    };

    {
        let tx = conn.transaction().unwrap();
        let session = synced_session(&tx);
        let mut user = session.find("user", user_id).unwrap().unwrap();
        user.write_attribute("name", FieldValue::Null).unwrap();
        assert!(session.save(&mut user).is_err());
    }

    let name: Option<String> = conn
        .query_row("SELECT name FROM users WHERE id = ?1;", [user_id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(name.as_deref(), Some("Ada"));
}

#[test]
fn custom_mapper_extends_sync() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), entities());
    session
        .model_sync(
            "user",
            SyncOptions::new("profile")
                .relationship("id", "user_id")
                .map("id", "user_id")
                .map("name", "display_name")
                .with_mapper(|master, slave| {
                    let email = master.read_attribute("email").unwrap_or(FieldValue::Null);
                    let contact = match email.as_text() {
                        Some(address) => FieldValue::from(format!("mailto:{address}")),
                        None => FieldValue::Null,
                    };
                    slave.write_attribute("contact", contact)
                }),
        )
        .unwrap();

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    let slave = session.create_slave(&user).unwrap().unwrap();

    assert_eq!(
        slave.read_attribute("contact"),
        Some(FieldValue::from("mailto:ada@example.com"))
    );
}

const CHAIN_SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
     CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER, display_name TEXT);
     CREATE TABLE badges (id INTEGER PRIMARY KEY, profile_id INTEGER, name TEXT);",
)];

#[test]
fn hook_writes_to_slave_do_not_cascade_to_its_own_slave() {
    let conn = open_db_in_memory(CHAIN_SCHEMA).unwrap();
    let mut registry = EntityRegistry::new();
    for name in ["user", "profile", "badge"] {
        registry.register(EntityType::new(name).unwrap()).unwrap();
    }
    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), registry);
    session
        .model_sync(
            "user",
            SyncOptions::new("profile")
                .relationship("id", "user_id")
                .map("id", "user_id")
                .map("name", "display_name"),
        )
        .unwrap();
    session
        .model_sync(
            "profile",
            SyncOptions::new("badge")
                .relationship("id", "profile_id")
                .map("id", "profile_id")
                .map("display_name", "name"),
        )
        .unwrap();

    let mut user = Record::new("user").with("name", "Ada");
    session.save(&mut user).unwrap();
    let profile = session.create_slave(&user).unwrap().unwrap();
    let badge = session.create_slave(&profile).unwrap().unwrap();
    assert_eq!(badge.read_attribute("name"), Some(FieldValue::from("Ada")));

    user.write_attribute("name", "Ada Lovelace").unwrap();
    session.save(&mut user).unwrap();

    let profile = session.find_slave(&user).unwrap().unwrap();
    assert_eq!(
        profile.read_attribute("display_name"),
        Some(FieldValue::from("Ada Lovelace"))
    );
    let badge = session.find("badge", badge.id().unwrap()).unwrap().unwrap();
    assert_eq!(badge.read_attribute("name"), Some(FieldValue::from("Ada")));

    session.destroy(&mut user).unwrap();
    assert_eq!(count(&conn, "users"), 0);
    assert_eq!(count(&conn, "profiles"), 0);
    assert_eq!(count(&conn, "badges"), 1);
}

struct NameGuard {
    label: &'static str,
    log: Arc<Mutex<Vec<String>>>,
    blocked_name: Option<&'static str>,
}

impl LifecycleHook for NameGuard {
    fn hook_name(&self) -> &str {
        self.label
    }

    fn after_save(&self, _store: &dyn RecordStore, record: &Record) -> SyncResult<()> {
        self.log.lock().unwrap().push(self.label.to_string());
        let name = record.read_attribute("name");
        match self.blocked_name {
            Some(blocked) if name == Some(FieldValue::from(blocked)) => Err(SyncError::Repo(
                RepoError::InvalidData(format!("{} rejected name", self.label)),
            )),
            _ => Ok(()),
        }
    }
}

#[test]
fn registered_hooks_run_in_order_with_sync_policy_and_errors_abort_save() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), entities());

    session
        .register_hook(
            "users",
            Arc::new(NameGuard {
                label: "audit",
                log: Arc::clone(&log),
                blocked_name: None,
            }),
        )
        .unwrap();
    session
        .register_hook(
            "user",
            Arc::new(NameGuard {
                label: "guard",
                log: Arc::clone(&log),
                blocked_name: Some("blocked"),
            }),
        )
        .unwrap();
    session.model_sync("user", profile_options()).unwrap();

    let unknown = session.register_hook(
        "account",
        Arc::new(NameGuard {
            label: "stray",
            log: Arc::clone(&log),
            blocked_name: None,
        }),
    );
    assert_eq!(
        unknown.unwrap_err(),
        SyncConfigError::UnknownMasterType("account".to_string())
    );

    let mut user = new_user("Ada");
    session.save(&mut user).unwrap();
    session.create_slave(&user).unwrap();
    assert_eq!(log.lock().unwrap().as_slice(), ["audit", "guard"]);

    user.write_attribute("name", "blocked").unwrap();
    let err = session.save(&mut user).unwrap_err();
    assert!(matches!(err, SyncError::Repo(RepoError::InvalidData(_))));
    assert_eq!(
        log.lock().unwrap().as_slice(),
        ["audit", "guard", "audit", "guard"]
    );

    let profile = session.find_slave(&user).unwrap().unwrap();
    assert_eq!(profile.read_attribute("display_name"), Some(FieldValue::from("Ada")));
    let stored = session.find("user", user.id().unwrap()).unwrap().unwrap();
    assert_eq!(stored.read_attribute("name"), Some(FieldValue::from("blocked")));
}
