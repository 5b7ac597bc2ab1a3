//! Outline domain model.
//!
//! # Responsibility
//! - Define the tray record shared by every graph algorithm and store.
//! - Own schema normalization for documents read from storage or clipboard.
//!
//! # Invariants
//! - Every tray is identified by a stable `TrayId`.
//! - Removal is expressed by unlinking edges, never by deleting documents.

pub mod tray;
