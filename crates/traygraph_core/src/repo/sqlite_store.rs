//! SQLite-backed tray store.
//!
//! # Responsibility
//! - Persist one JSON document per tray, keyed by tray id.
//! - Normalize documents on read instead of trusting the stored shape.
//!
//! # Invariants
//! - Writes validate the tray and upsert in a single statement.
//! - Reads of unknown ids return `None`; unreadable documents are errors.

use crate::db::migrations::latest_version;
use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::{StoreError, StoreResult, TrayScan, TrayStore};
use async_trait::async_trait;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed implementation of [`TrayStore`].
pub struct SqliteTrayStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrayStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_tray_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_document(&self, id: &str) -> StoreResult<Option<Tray>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM trays WHERE uuid = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(document) = document else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_str(&document)
            .map_err(|err| StoreError::invalid_document(id, err))?;
        let tray = Tray::from_document(&value).map_err(|err| StoreError::invalid_document(id, err))?;
        if tray.id != id {
            return Err(StoreError::invalid_document(
                id,
                format!("document carries foreign id `{}`", tray.id),
            ));
        }
        Ok(Some(tray))
    }

    fn upsert_document(&self, tray: &Tray) -> StoreResult<()> {
        tray.validate()?;
        let document = serde_json::to_string(tray)
            .map_err(|err| StoreError::invalid_document(&tray.id, err))?;
        self.conn.execute(
            "INSERT INTO trays (uuid, document, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(uuid) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at;",
            params![tray.id, document, tray.last_modified],
        )?;
        debug!(
            "event=tray_save module=store status=ok backend=sqlite children={} parents={}",
            tray.children.len(),
            tray.parents.len()
        );
        Ok(())
    }
}

#[async_trait(?Send)]
impl TrayStore for SqliteTrayStore<'_> {
    async fn load_tray(&self, id: &str) -> StoreResult<Option<Tray>> {
        self.load_document(id)
    }

    async fn save_tray(&self, tray: &Tray) -> StoreResult<()> {
        self.upsert_document(tray)
    }
}

#[async_trait(?Send)]
impl TrayScan for SqliteTrayStore<'_> {
    async fn list_tray_ids(&self) -> StoreResult<Vec<TrayId>> {
        let mut stmt = self.conn.prepare("SELECT uuid FROM trays ORDER BY uuid ASC;")?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get(0)?);
        }
        Ok(ids)
    }
}

fn ensure_tray_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
