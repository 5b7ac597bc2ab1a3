//! Consistency repair of mirrored parent/child edges.
//!
//! # Responsibility
//! - Restore the mirrored-edge invariant for a tray and its reachable subtree:
//!   every explicit child lists the parent, every listed parent lists the child.
//!
//! # Invariants
//! - Each tray is processed at most once per pass (diamonds and cycles).
//! - Only children are descended into; parents are fixed but not walked.
//! - Unloadable references are skipped. A failed save aborts the pass.
//! - A graph that already satisfies the invariant produces zero saves.

use crate::graph::load_many;
use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::{StoreResult, TrayStore};
use log::{info, warn};
use std::collections::HashSet;

/// Counters describing one repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Trays whose edges were checked.
    pub visited: usize,
    /// Children that gained a missing parent back-reference.
    pub children_fixed: usize,
    /// Parents that gained a missing child entry.
    pub parents_fixed: usize,
    /// Referenced ids that could not be loaded.
    pub missing: usize,
}

impl RepairReport {
    /// Number of saves issued by the pass.
    pub fn saves(&self) -> usize {
        self.children_fixed + self.parents_fixed
    }
}

/// Repairs `tray` and every tray reachable through its explicit children.
///
/// The stored version of each tray is used when available so a stale caller
/// snapshot does not hide edges saved by earlier fixes; `tray` itself is used
/// only when the store has no copy.
pub async fn repair_subtree<S: TrayStore + ?Sized>(
    store: &S,
    tray: &Tray,
) -> StoreResult<RepairReport> {
    let mut report = RepairReport::default();
    let mut visited: HashSet<TrayId> = HashSet::new();
    let mut pending: Vec<TrayId> = vec![tray.id.clone()];

    while let Some(current_id) = pending.pop() {
        if !visited.insert(current_id.clone()) {
            continue;
        }
        let current = match store.load_tray(&current_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) if current_id == tray.id => tray.clone(),
            Ok(None) => {
                report.missing += 1;
                continue;
            }
            Err(err) => {
                warn!("event=repair module=repair status=skip error={err}");
                report.missing += 1;
                continue;
            }
        };
        report.visited += 1;

        let validated = repair_children(store, &current, &mut report).await?;
        repair_parents(store, &current, &mut report).await?;

        for child_id in validated.into_iter().rev() {
            if !visited.contains(&child_id) {
                pending.push(child_id);
            }
        }
    }

    info!(
        "event=repair module=repair status=ok visited={} children_fixed={} parents_fixed={} missing={}",
        report.visited, report.children_fixed, report.parents_fixed, report.missing
    );
    Ok(report)
}

/// Adds `tray.id` to each loaded child's parents. Returns the loaded child ids.
async fn repair_children<S: TrayStore + ?Sized>(
    store: &S,
    tray: &Tray,
    report: &mut RepairReport,
) -> StoreResult<Vec<TrayId>> {
    let child_ids: Vec<TrayId> = tray
        .children
        .iter()
        .filter(|id| **id != tray.id)
        .cloned()
        .collect();

    let mut validated = Vec::with_capacity(child_ids.len());
    for (child_id, child) in load_many(store, &child_ids, "repair").await {
        let Some(mut child) = child else {
            report.missing += 1;
            continue;
        };
        if child.add_parent(&tray.id) {
            child.touch();
            store.save_tray(&child).await?;
            report.children_fixed += 1;
        }
        validated.push(child_id);
    }
    Ok(validated)
}

/// Adds `tray.id` to each loaded parent's children.
async fn repair_parents<S: TrayStore + ?Sized>(
    store: &S,
    tray: &Tray,
    report: &mut RepairReport,
) -> StoreResult<()> {
    let parent_ids: Vec<TrayId> = tray
        .parents
        .iter()
        .filter(|id| **id != tray.id)
        .cloned()
        .collect();

    for (_, parent) in load_many(store, &parent_ids, "repair").await {
        let Some(mut parent) = parent else {
            report.missing += 1;
            continue;
        };
        if parent.push_child(&tray.id) {
            parent.touch();
            store.save_tray(&parent).await?;
            report.parents_fixed += 1;
        }
    }
    Ok(())
}
