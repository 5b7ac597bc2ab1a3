//! Tray store adapter contract.
//!
//! # Responsibility
//! - Define async point lookup and upsert of one tray document by id.
//! - Define the error taxonomy shared by every store implementation.
//!
//! # Invariants
//! - `load_tray` returns `Ok(None)` for missing ids and never errors for absence.
//! - `save_tray` upserts and must call `Tray::validate()` before writing.
//! - There is no transaction spanning multiple saves.

use crate::db::DbError;
use crate::model::tray::{Tray, TrayId, TrayValidationError};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by tray store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Tray rejected before write.
    Validation(TrayValidationError),
    /// Stored document could not be normalized.
    InvalidDocument { id: TrayId, reason: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Host-provided store rejected the request.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidDocument { id, reason } => {
                write!(f, "invalid tray document {id}: {reason}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tray store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::Backend(message) => write!(f, "tray store failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TrayValidationError> for StoreError {
    fn from(value: TrayValidationError) -> Self {
        Self::Validation(value)
    }
}

impl StoreError {
    pub(crate) fn invalid_document(id: &str, err: impl Display) -> Self {
        Self::InvalidDocument {
            id: id.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Async point access to persisted trays.
///
/// Futures are not required to be `Send`: the graph algorithms run on a
/// single-threaded cooperative executor.
#[async_trait(?Send)]
pub trait TrayStore {
    /// Loads one tray by id; `None` when absent.
    async fn load_tray(&self, id: &str) -> StoreResult<Option<Tray>>;
    /// Upserts one tray by id, creating the document when absent.
    async fn save_tray(&self, tray: &Tray) -> StoreResult<()>;
}

/// Stores that can enumerate every persisted id.
#[async_trait(?Send)]
pub trait TrayScan: TrayStore {
    /// Lists all stored tray ids in a stable order.
    async fn list_tray_ids(&self) -> StoreResult<Vec<TrayId>>;
}

#[async_trait(?Send)]
impl<S: TrayStore + ?Sized> TrayStore for &S {
    async fn load_tray(&self, id: &str) -> StoreResult<Option<Tray>> {
        (**self).load_tray(id).await
    }

    async fn save_tray(&self, tray: &Tray) -> StoreResult<()> {
        (**self).save_tray(tray).await
    }
}

#[async_trait(?Send)]
impl<S: TrayScan + ?Sized> TrayScan for &S {
    async fn list_tray_ids(&self) -> StoreResult<Vec<TrayId>> {
        (**self).list_tray_ids().await
    }
}
