//! One-way master-to-slave synchronization.
//!
//! # Responsibility
//! - Capture per-master-type sync policies at configuration time.
//! - Locate, update, create and destroy slave records driven by master
//!   lifecycle events.
//!
//! # Invariants
//! - A policy is immutable once configured.
//! - Exactly one relationship key pair locates a slave.
//! - Sync mutates the slave in memory; persistence is the caller's step.
//! - Master and slave writes are not wrapped in a shared transaction here.

pub mod error;
pub mod hooks;
pub mod locator;
pub mod operations;
pub mod policy;
pub mod synchronizer;
