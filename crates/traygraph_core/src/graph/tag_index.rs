//! Session-scoped tag index.
//!
//! # Responsibility
//! - Map each tag to the ids of trays carrying it.
//! - Map each watched tag to the ids of trays watching it.
//!
//! # Invariants
//! - For every observed tray, `ids_for(t)` contains its id iff its last
//!   observed `tags` contains `t`.
//! - The index is a best-effort cache of trays seen in this session. It is
//!   never persisted and can be rebuilt from a full scan.

use crate::model::tray::{Tray, TrayId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tags whose membership changed when a tray was observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TagChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Every tag whose member set changed.
    pub fn touched(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.removed.iter())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    members: BTreeMap<String, BTreeSet<TrayId>>,
    watchers: BTreeMap<String, BTreeSet<TrayId>>,
    tags_by_tray: HashMap<TrayId, BTreeSet<String>>,
    watch_tags_by_tray: HashMap<TrayId, BTreeSet<String>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the tray id under each of its tags; already-recorded ids are skipped.
    pub fn index(&mut self, tray: &Tray) {
        for tag in &tray.tags {
            self.members
                .entry(tag.clone())
                .or_default()
                .insert(tray.id.clone());
        }
        self.tags_by_tray
            .entry(tray.id.clone())
            .or_default()
            .extend(tray.tags.iter().cloned());
    }

    /// Removes the tray id from each named tag.
    pub fn unindex(&mut self, tray_id: &str, removed_tags: &[String]) {
        for tag in removed_tags {
            remove_member(&mut self.members, tag, tray_id);
        }
        if let Some(known) = self.tags_by_tray.get_mut(tray_id) {
            for tag in removed_tags {
                known.remove(tag);
            }
        }
    }

    /// Records the tray's current tag and watch-tag sets.
    ///
    /// Tags dropped since the previous observation are unindexed. Returns the
    /// member-set changes so watchers of those tags can be refreshed.
    pub fn observe(&mut self, tray: &Tray) -> TagChange {
        let current: BTreeSet<String> = tray.tags.iter().cloned().collect();
        let previous = self.tags_by_tray.get(&tray.id).cloned().unwrap_or_default();

        let removed: Vec<String> = previous.difference(&current).cloned().collect();
        let added: Vec<String> = current.difference(&previous).cloned().collect();
        self.unindex(&tray.id, &removed);
        self.index(tray);

        self.observe_watch_tags(tray);
        TagChange { added, removed }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Ids of trays tagged with `tag`, sorted.
    pub fn ids_for(&self, tag: &str) -> Vec<TrayId> {
        self.members
            .get(tag)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of trays watching `tag`, sorted.
    pub fn watchers_of(&self, tag: &str) -> Vec<TrayId> {
        self.watchers
            .get(tag)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tags last observed for a tray; `None` until it has been observed.
    pub fn tags_of(&self, tray_id: &str) -> Option<&BTreeSet<String>> {
        self.tags_by_tray.get(tray_id)
    }

    fn observe_watch_tags(&mut self, tray: &Tray) {
        let current: BTreeSet<String> = tray.watch_tags.iter().cloned().collect();
        let previous = self
            .watch_tags_by_tray
            .insert(tray.id.clone(), current.clone())
            .unwrap_or_default();
        for tag in previous.difference(&current) {
            remove_member(&mut self.watchers, tag, &tray.id);
        }
        for tag in current {
            self.watchers.entry(tag).or_default().insert(tray.id.clone());
        }
    }
}

fn remove_member(map: &mut BTreeMap<String, BTreeSet<TrayId>>, tag: &str, tray_id: &str) {
    if let Some(ids) = map.get_mut(tag) {
        ids.remove(tray_id);
        if ids.is_empty() {
            map.remove(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TagIndex;
    use crate::model::tray::Tray;

    fn tagged(id: &str, tags: &[&str]) -> Tray {
        let mut tray = Tray::with_id(id, id);
        tray.tags = tags.iter().map(|t| t.to_string()).collect();
        tray
    }

    #[test]
    fn index_skips_already_recorded_ids() {
        let mut index = TagIndex::new();
        let tray = tagged("a", &["work"]);
        index.index(&tray);
        index.index(&tray);
        assert_eq!(index.ids_for("work"), vec!["a".to_string()]);
    }

    #[test]
    fn unindex_removes_only_named_tags() {
        let mut index = TagIndex::new();
        index.index(&tagged("a", &["work", "home"]));
        index.unindex("a", &["work".to_string()]);
        assert!(index.ids_for("work").is_empty());
        assert_eq!(index.ids_for("home"), vec!["a".to_string()]);
    }

    #[test]
    fn observe_tracks_tag_set_changes() {
        let mut index = TagIndex::new();
        let change = index.observe(&tagged("a", &["work", "home"]));
        assert_eq!(change.added, vec!["home".to_string(), "work".to_string()]);

        let change = index.observe(&tagged("a", &["home", "idea"]));
        assert_eq!(change.added, vec!["idea".to_string()]);
        assert_eq!(change.removed, vec!["work".to_string()]);
        assert!(index.ids_for("work").is_empty());
        assert_eq!(index.ids_for("idea"), vec!["a".to_string()]);

        assert!(index.observe(&tagged("a", &["home", "idea"])).is_empty());
    }

    #[test]
    fn watchers_follow_watch_tags() {
        let mut index = TagIndex::new();
        let mut watcher = Tray::with_id("w", "w");
        watcher.watch_tags = vec!["work".to_string()];
        index.observe(&watcher);
        assert_eq!(index.watchers_of("work"), vec!["w".to_string()]);

        watcher.watch_tags = vec!["home".to_string()];
        index.observe(&watcher);
        assert!(index.watchers_of("work").is_empty());
        assert_eq!(index.watchers_of("home"), vec!["w".to_string()]);

        assert!(index.tags_of("w").is_some_and(|tags| tags.is_empty()));
        assert!(index.tags_of("unseen").is_none());
    }
}
