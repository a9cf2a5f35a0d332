//! Dynamic record model shared by master and slave entity types.
//!
//! # Responsibility
//! - Represent one persistent row of any registered entity type.
//! - Provide attribute read/write primitives used by synchronization.
//!
//! # Invariants
//! - Every record carries the name of the entity type it belongs to.
//! - The primary key is addressed through the reserved `id` attribute name.

pub mod record;
