//! Focus navigation over the multi-parent tray graph.
//!
//! # Responsibility
//! - Compute the next focus path for directional movement.
//!
//! # Invariants
//! - Focus is a path from the session root, not a single id: a tray with
//!   several parents is disambiguated by the path that reached it.
//! - Navigation never fails on missing trays; it degrades to staying put or
//!   moving to the parent path.
//! - Siblings that no longer acknowledge the parent are skipped.

use crate::graph::load_many;
use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::TrayStore;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Ordered ids from the session root to the focused tray.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusPath(Vec<TrayId>);

impl FocusPath {
    pub fn new(ids: Vec<TrayId>) -> Self {
        Self(ids)
    }

    /// Path holding only the session root.
    pub fn root(id: impl Into<TrayId>) -> Self {
        Self(vec![id.into()])
    }

    pub fn ids(&self) -> &[TrayId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Focused tray id.
    pub fn current(&self) -> Option<&TrayId> {
        self.0.last()
    }

    /// Parent in the current viewing context.
    pub fn parent(&self) -> Option<&TrayId> {
        self.0.len().checked_sub(2).and_then(|index| self.0.get(index))
    }

    /// Path with the last element removed, `None` at the root.
    pub fn parent_path(&self) -> Option<Self> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Path extended by `child`.
    pub fn child_path(&self, child: &str) -> Self {
        let mut ids = self.0.clone();
        ids.push(child.to_string());
        Self(ids)
    }

    /// Path with the last element replaced by `sibling`.
    pub fn sibling_path(&self, sibling: &str) -> Self {
        let mut ids = self.0.clone();
        ids.pop();
        ids.push(sibling.to_string());
        Self(ids)
    }
}

impl From<Vec<TrayId>> for FocusPath {
    fn from(value: Vec<TrayId>) -> Self {
        Self(value)
    }
}

/// Result of a focus move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusOutcome {
    Moved(FocusPath),
    Unchanged,
    /// Descending requires the caller to unfold the focused tray first.
    NeedsUnfold,
}

impl FocusOutcome {
    /// The path focus should hold after this outcome.
    pub fn resolve(self, current: &FocusPath) -> FocusPath {
        match self {
            Self::Moved(path) => path,
            Self::Unchanged | Self::NeedsUnfold => current.clone(),
        }
    }
}

/// Computes where focus goes when moving `direction` from `path`.
pub async fn move_focus<S: TrayStore + ?Sized>(
    store: &S,
    path: &FocusPath,
    direction: FocusDirection,
) -> FocusOutcome {
    match direction {
        FocusDirection::Left => path
            .parent_path()
            .map_or(FocusOutcome::Unchanged, FocusOutcome::Moved),
        FocusDirection::Right => descend(store, path).await,
        FocusDirection::Up => step_sibling(store, path, -1).await,
        FocusDirection::Down => step_sibling(store, path, 1).await,
    }
}

async fn descend<S: TrayStore + ?Sized>(store: &S, path: &FocusPath) -> FocusOutcome {
    let Some(current_id) = path.current() else {
        return FocusOutcome::Unchanged;
    };
    let Some(current) = load_quietly(store, current_id).await else {
        return FocusOutcome::Unchanged;
    };
    let candidates = current.effective_children();
    if candidates.is_empty() {
        return FocusOutcome::Unchanged;
    }
    if current.folded {
        return FocusOutcome::NeedsUnfold;
    }

    let loaded = load_many(store, &candidates, "navigator").await;
    let acknowledged = loaded.iter().find_map(|(id, child)| {
        child
            .as_ref()
            .filter(|child| child.has_parent(&current.id))
            .map(|_| id)
    });
    let implicit = || {
        loaded.iter().find_map(|(id, child)| {
            child
                .as_ref()
                .filter(|_| current.is_implicit_child(id))
                .map(|_| id)
        })
    };

    match acknowledged.or_else(implicit) {
        Some(child_id) => FocusOutcome::Moved(path.child_path(child_id)),
        None => FocusOutcome::Unchanged,
    }
}

async fn step_sibling<S: TrayStore + ?Sized>(
    store: &S,
    path: &FocusPath,
    step: isize,
) -> FocusOutcome {
    let (Some(current_id), Some(parent_id)) = (path.current(), path.parent()) else {
        return FocusOutcome::Unchanged;
    };
    let Some(parent) = load_quietly(store, parent_id).await else {
        return FocusOutcome::Unchanged;
    };
    let siblings = parent.effective_children();
    let Some(start) = siblings.iter().position(|id| id == current_id) else {
        return path
            .parent_path()
            .map_or(FocusOutcome::Unchanged, FocusOutcome::Moved);
    };

    let mut index = start as isize;
    loop {
        index += step;
        if index < 0 || index as usize >= siblings.len() {
            return FocusOutcome::Unchanged;
        }
        let candidate_id = &siblings[index as usize];
        if let Some(candidate) = load_quietly(store, candidate_id).await {
            if belongs_to(&parent, &candidate) {
                return FocusOutcome::Moved(path.sibling_path(candidate_id));
            }
        }
    }
}

fn belongs_to(parent: &Tray, candidate: &Tray) -> bool {
    candidate.has_parent(&parent.id) || parent.is_implicit_child(&candidate.id)
}

async fn load_quietly<S: TrayStore + ?Sized>(store: &S, id: &str) -> Option<Tray> {
    match store.load_tray(id).await {
        Ok(tray) => tray,
        Err(err) => {
            warn!("event=focus_move module=navigator status=skip error={err}");
            None
        }
    }
}
