//! Watch-tag aggregation.
//!
//! # Responsibility
//! - Derive a tray's implicit children from its watch tags and the tag index.
//! - Report whether the derived list changed so callers write only then.
//!
//! # Invariants
//! - Implicit children live in `Tray::watched`, never in `Tray::children`.
//! - The watcher's own id and ids already explicit children are excluded.
//! - A previously derived id is dropped only when the index has observed that
//!   tray without a watched tag, or the watcher no longer watches anything.
//!   Trays not yet seen this session keep their place.
//! - Re-running with unchanged tags and index reports no change.

use crate::graph::tag_index::TagIndex;
use crate::model::tray::{Tray, TrayId};

/// Computes implicit children for `tray`.
///
/// Previously derived ids that are still eligible keep their position; new
/// matches are appended in tag order, then id order.
pub fn aggregate_watched(tray: &Tray, index: &TagIndex) -> Vec<TrayId> {
    if tray.watch_tags.is_empty() {
        return Vec::new();
    }

    let mut watched: Vec<TrayId> = Vec::new();
    for id in &tray.watched {
        let eligible = *id != tray.id && !tray.has_child(id) && !watched.contains(id);
        if eligible && still_watched(tray, index, id) {
            watched.push(id.clone());
        }
    }
    for tag in &tray.watch_tags {
        for id in index.ids_for(tag) {
            if id != tray.id && !tray.has_child(&id) && !watched.contains(&id) {
                watched.push(id);
            }
        }
    }
    watched
}

/// Unobserved trays are assumed to still match.
fn still_watched(tray: &Tray, index: &TagIndex, id: &str) -> bool {
    match index.tags_of(id) {
        Some(tags) => tray.watch_tags.iter().any(|tag| tags.contains(tag)),
        None => true,
    }
}

/// Recomputes `tray.watched` in place. Returns `true` when it changed.
pub fn apply_watch_aggregation(tray: &mut Tray, index: &TagIndex) -> bool {
    let watched = aggregate_watched(tray, index);
    if watched == tray.watched {
        return false;
    }
    tray.watched = watched;
    tray.touch();
    true
}
