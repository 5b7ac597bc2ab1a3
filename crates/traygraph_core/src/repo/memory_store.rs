//! In-memory tray store.
//!
//! Ephemeral [`TrayStore`] for hosts without persistence and for tests. Keeps
//! a save counter so callers can assert that an operation wrote nothing, and
//! can be told to reject saves of specific ids to exercise partial failure.

use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::{StoreError, StoreResult, TrayScan, TrayStore};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Default)]
pub struct InMemoryTrayStore {
    trays: RefCell<BTreeMap<TrayId, Tray>>,
    failing_saves: RefCell<HashSet<TrayId>>,
    save_count: Cell<usize>,
}

impl InMemoryTrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store seeded with `trays` without counting saves.
    pub fn with_trays(trays: impl IntoIterator<Item = Tray>) -> Self {
        let store = Self::new();
        for tray in trays {
            store.insert(tray);
        }
        store
    }

    /// Seeds one tray as-is, bypassing validation and the save counter.
    pub fn insert(&self, tray: Tray) {
        self.trays.borrow_mut().insert(tray.id.clone(), tray);
    }

    /// Synchronous snapshot of one stored tray.
    pub fn get(&self, id: &str) -> Option<Tray> {
        self.trays.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.trays.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trays.borrow().is_empty()
    }

    /// Number of successful saves since creation or the last reset.
    pub fn save_count(&self) -> usize {
        self.save_count.get()
    }

    pub fn reset_save_count(&self) {
        self.save_count.set(0);
    }

    /// Makes every later save of `id` fail with [`StoreError::Backend`].
    pub fn fail_saves_for(&self, id: impl Into<TrayId>) {
        self.failing_saves.borrow_mut().insert(id.into());
    }

    pub fn clear_save_failures(&self) {
        self.failing_saves.borrow_mut().clear();
    }
}

#[async_trait(?Send)]
impl TrayStore for InMemoryTrayStore {
    async fn load_tray(&self, id: &str) -> StoreResult<Option<Tray>> {
        Ok(self.get(id))
    }

    async fn save_tray(&self, tray: &Tray) -> StoreResult<()> {
        tray.validate()?;
        if self.failing_saves.borrow().contains(&tray.id) {
            return Err(StoreError::Backend(format!("save rejected for {}", tray.id)));
        }
        self.insert(tray.clone());
        self.save_count.set(self.save_count.get() + 1);
        Ok(())
    }
}

#[async_trait(?Send)]
impl TrayScan for InMemoryTrayStore {
    async fn list_tray_ids(&self) -> StoreResult<Vec<TrayId>> {
        Ok(self.trays.borrow().keys().cloned().collect())
    }
}
