//! Core domain logic for the tray outliner.
//! This crate is the single source of truth for tray graph invariants.

pub mod clipboard;
pub mod config;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod outline;
pub mod repo;
pub mod service;

pub use clipboard::{Clipboard, ClipboardError, ClipboardResult, MemoryClipboard};
pub use config::TrayGraphConfig;
pub use graph::navigator::{move_focus, FocusDirection, FocusOutcome, FocusPath};
pub use graph::repair::{repair_subtree, RepairReport};
pub use graph::tag_index::{TagChange, TagIndex};
pub use graph::transplant::{
    transplant_copy, transplant_reference, TransplantError, TransplantOutcome,
};
pub use graph::traversal::{export_subtree, subtree_to_json};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::tray::{
    LayoutAxis, Tray, TrayDocumentError, TrayId, TrayValidationError, TRAY_SCHEMA_VERSION,
};
pub use outline::markdown::{parse_markdown_outline, render_markdown_outline};
pub use repo::memory_store::InMemoryTrayStore;
pub use repo::sqlite_store::SqliteTrayStore;
pub use repo::tray_store::{StoreError, StoreResult, TrayScan, TrayStore};
pub use service::tray_service::{
    Attached, ChildrenLoad, ServiceResult, TrayService, TrayServiceError,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
