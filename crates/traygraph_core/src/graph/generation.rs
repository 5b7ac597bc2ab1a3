//! Per-tray generation counters for child loading.
//!
//! # Responsibility
//! - Track when a tray's effective children list changes.
//! - Let async child loads detect that a newer list superseded them.
//!
//! # Invariants
//! - A generation only grows; it advances exactly when the observed effective
//!   children differ from the previously observed list.

use crate::model::tray::{Tray, TrayId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ChildrenGenerations {
    entries: HashMap<TrayId, Entry>,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    generation: u64,
    children: Vec<TrayId>,
}

impl ChildrenGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the tray's effective children and returns its generation.
    pub fn observe(&mut self, tray: &Tray) -> u64 {
        let children = tray.effective_children();
        match self.entries.get_mut(&tray.id) {
            Some(entry) => {
                if entry.children != children {
                    entry.children = children;
                    entry.generation += 1;
                }
                entry.generation
            }
            None => {
                self.entries.insert(
                    tray.id.clone(),
                    Entry {
                        generation: 0,
                        children,
                    },
                );
                0
            }
        }
    }

    /// Generation last recorded for `id`; unseen trays are at zero.
    pub fn current(&self, id: &str) -> u64 {
        self.entries.get(id).map_or(0, |entry| entry.generation)
    }
}
