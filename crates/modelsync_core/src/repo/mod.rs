//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the persistence primitives synchronization relies on.
//! - Isolate SQLite query details from sync policy logic.
//!
//! # Invariants
//! - Query values are always bound parameters, never interpolated.
//! - Identifiers are validated before they are quoted into SQL text.

pub mod record_repo;
