//! CLI smoke entry point.
//!
//! Runs a tiny in-memory user/profile sync to verify `modelsync_core`
//! linkage. Pass a declarations JSON path to configure from a file instead
//! of the built-in user -> profile policy.

use modelsync_core::db::{open_db_in_memory, Migration};
use modelsync_core::{
    load_declarations, EntityRegistry, EntityType, ModelSession, Record, SqliteRecordStore,
    SyncOptions,
};
use std::error::Error;
use std::process::ExitCode;

const DEMO_SCHEMA: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, email TEXT);
     CREATE TABLE profiles (id INTEGER PRIMARY KEY, user_id INTEGER, display_name TEXT, contact TEXT);",
)];

fn main() -> ExitCode {
    println!("modelsync_core version={}", modelsync_core::core_version());
    match run(std::env::args().nth(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("modelsync demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(declarations_path: Option<String>) -> Result<(), Box<dyn Error>> {
    let conn = open_db_in_memory(DEMO_SCHEMA)?;
    let mut entities = EntityRegistry::new();
    entities.register(EntityType::new("user")?)?;
    entities.register(EntityType::new("profile")?)?;

    let mut session = ModelSession::new(SqliteRecordStore::new(&conn), entities);
    match declarations_path {
        Some(path) => {
            session.apply_declarations(load_declarations(path)?)?;
        }
        None => {
            session.model_sync(
                "user",
                SyncOptions::new("profile")
                    .relationship("id", "user_id")
                    .map("id", "user_id")
                    .map("name", "display_name")
                    .map("email", "contact"),
            )?;
        }
    }

    let mut user = Record::new("user")
        .with("name", "Ada")
        .with("email", "ada@example.com");
    session.save(&mut user)?;
    println!(
        "synced_before_create={}",
        session.is_synced_with_slave(&user)?
    );

    session.invoke(&user, "create_profile")?;
    user.write_attribute("name", "Ada Lovelace")?;
    session.save(&mut user)?;

    if let Some(profile) = session.find_slave(&user)? {
        for (name, value) in profile.attributes() {
            println!("profile.{name}={value:?}");
        }
    }

    session.destroy(&mut user)?;
    println!("synced_after_destroy={}", session.is_synced_with_slave(&user)?);
    Ok(())
}
