//! Session configuration.
//!
//! # Responsibility
//! - Hold the well-known identifiers and defaults a tray session starts from.

use crate::model::tray::{LayoutAxis, TrayId};
use std::path::{Path, PathBuf};

/// Id of the session root tray when none is configured.
pub const DEFAULT_ROOT_TRAY_ID: &str = "root-tray-uuid";
/// Display name given to a freshly created root tray.
pub const DEFAULT_ROOT_TRAY_NAME: &str = "Root Tray";
/// SQLite file name used under a data directory.
pub const DEFAULT_DB_FILE_NAME: &str = "traygraph.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayGraphConfig {
    pub root_tray_id: TrayId,
    pub root_tray_name: String,
    /// Layout axis assigned to trays created by the session.
    pub default_layout_axis: LayoutAxis,
    /// SQLite file name used when a data directory is given.
    pub db_file_name: String,
}

impl Default for TrayGraphConfig {
    fn default() -> Self {
        Self {
            root_tray_id: DEFAULT_ROOT_TRAY_ID.to_string(),
            root_tray_name: DEFAULT_ROOT_TRAY_NAME.to_string(),
            default_layout_axis: LayoutAxis::default(),
            db_file_name: DEFAULT_DB_FILE_NAME.to_string(),
        }
    }
}

impl TrayGraphConfig {
    /// Database path inside `data_dir`.
    pub fn db_path(&self, data_dir: impl AsRef<Path>) -> PathBuf {
        data_dir.as_ref().join(&self.db_file_name)
    }
}
