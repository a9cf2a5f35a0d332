//! Entity type registration and name resolution.
//!
//! # Responsibility
//! - Map lowercase entity names to their backing tables.
//! - Resolve configuration-time names using the singular/plural convention.
//!
//! # Invariants
//! - Entity names are stored lowercase and singular.
//! - Table and column identifiers are validated before reaching SQL text.

pub mod inflect;
pub mod registry;
