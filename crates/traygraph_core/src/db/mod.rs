//! Tray database bootstrap.
//!
//! # Responsibility
//! - Open the SQLite file (or memory database) that backs `SqliteTrayStore`.
//! - Bring its `trays` schema up to the version this binary understands.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - No tray document is read or written through a connection whose
//!   migrations failed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failures while preparing a tray database.
#[derive(Debug)]
pub enum DbError {
    /// SQLite refused to open the database (`mode` is `file` or `memory`).
    Open {
        mode: &'static str,
        source: rusqlite::Error,
    },
    /// A schema step failed; its transaction was rolled back.
    Migration { version: u32, source: rusqlite::Error },
    /// The file was written by a newer build.
    UnsupportedSchemaVersion { found: u32, supported: u32 },
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { mode, source } => {
                write!(f, "cannot open {mode} tray database: {source}")
            }
            Self::Migration { version, source } => {
                write!(f, "tray schema migration {version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion { found, supported } => write!(
                f,
                "tray database schema version {found} is newer than supported {supported}"
            ),
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open { source, .. } | Self::Migration { source, .. } => Some(source),
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
