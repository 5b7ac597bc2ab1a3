//! Tray store adapter contract and implementations.
//!
//! # Responsibility
//! - Define the async store contract consumed by graph algorithms.
//! - Isolate SQLite query details from graph/service orchestration.
//!
//! # Invariants
//! - Store writes must enforce `Tray::validate()` before persistence.
//! - Absence is `Ok(None)`, never an error.

pub mod memory_store;
pub mod sqlite_store;
pub mod tray_store;
