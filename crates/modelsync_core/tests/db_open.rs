use modelsync_core::db::migrations::latest_version;
use modelsync_core::db::{open_db, open_db_in_memory, DbError, Migration};
use rusqlite::Connection;

const SCHEMA: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
    ),
    Migration::new(
        2,
        "CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id));",
    ),
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory(SCHEMA).unwrap();

    assert_eq!(schema_version(&conn), latest_version(SCHEMA));
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "profiles");
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory(SCHEMA).unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modelsync.db");

    let first = open_db(&path, SCHEMA).unwrap();
    assert_eq!(schema_version(&first), 2);
    drop(first);

    let second = open_db(&path, SCHEMA).unwrap();
    assert_eq!(schema_version(&second), 2);
    assert_table_exists(&second, "profiles");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path, SCHEMA).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
