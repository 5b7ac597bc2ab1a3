//! Subtree export by depth-first traversal.
//!
//! # Invariants
//! - Every reachable tray appears exactly once, even across diamonds and cycles.
//! - The root comes first whenever it is loadable.

use crate::model::tray::{Tray, TrayId};
use crate::repo::tray_store::TrayStore;
use log::{debug, warn};
use std::collections::HashSet;

/// Collects every tray reachable from `root_id` via explicit `children` edges.
///
/// Missing or unreadable trays are skipped. Output order follows the
/// traversal and is otherwise unspecified.
pub async fn export_subtree<S: TrayStore + ?Sized>(store: &S, root_id: &str) -> Vec<Tray> {
    let mut visited: HashSet<TrayId> = HashSet::new();
    let mut stack: Vec<TrayId> = vec![root_id.to_string()];
    let mut collected = Vec::new();

    while let Some(current) = stack.pop() {
        if visited.contains(&current) {
            continue;
        }
        let tray = match store.load_tray(&current).await {
            Ok(Some(tray)) => tray,
            Ok(None) => continue,
            Err(err) => {
                warn!("event=subtree_export module=traversal status=skip error={err}");
                continue;
            }
        };
        visited.insert(current);

        // Reversed so the first child is visited first.
        for child in tray.children.iter().rev() {
            if !visited.contains(child) {
                stack.push(child.clone());
            }
        }
        collected.push(tray);
    }

    debug!(
        "event=subtree_export module=traversal status=ok count={}",
        collected.len()
    );
    collected
}

/// Serializes an exported subtree as the clipboard JSON array.
pub fn subtree_to_json(trays: &[Tray]) -> serde_json::Result<String> {
    serde_json::to_string(trays)
}
