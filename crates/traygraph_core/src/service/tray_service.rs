//! Tray session facade.
//!
//! # Responsibility
//! - Route every load and save through the session tag index and children
//!   generations.
//! - Provide editing, linking, repair and focus operations over a store.
//!
//! # Invariants
//! - Every loaded or saved tray is observed by the session tag index.
//! - Watch aggregation runs reactively: on the saved tray itself and on every
//!   watcher of a tag whose membership changed.
//! - Removal is unlinking; trays are never deleted.
//! - No `RefCell` borrow is held across an await point.

use crate::clipboard::ClipboardError;
use crate::config::TrayGraphConfig;
use crate::graph::generation::ChildrenGenerations;
use crate::graph::load_many;
use crate::graph::navigator::{move_focus, FocusDirection, FocusOutcome, FocusPath};
use crate::graph::repair::{repair_subtree, RepairReport};
use crate::graph::tag_index::{TagChange, TagIndex};
use crate::graph::transplant::TransplantError;
use crate::graph::watch::apply_watch_aggregation;
use crate::model::tray::{normalize_tags, parse_tag_input, Tray, TrayId};
use crate::repo::tray_store::{StoreError, TrayScan, TrayStore};
use log::{debug, info, warn};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, TrayServiceError>;

/// Errors from tray session operations.
#[derive(Debug)]
pub enum TrayServiceError {
    /// Target tray does not exist in the store.
    TrayNotFound(TrayId),
    /// Linking would make a tray its own child.
    SelfLink(TrayId),
    /// Clipboard payload could not be produced.
    Serialize(String),
    Store(StoreError),
    Transplant(TransplantError),
    Clipboard(ClipboardError),
}

impl Display for TrayServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrayNotFound(id) => write!(f, "tray not found: {id}"),
            Self::SelfLink(id) => write!(f, "tray {id} cannot be linked under itself"),
            Self::Serialize(reason) => write!(f, "cannot serialize trays: {reason}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Transplant(err) => write!(f, "{err}"),
            Self::Clipboard(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrayServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Transplant(err) => Some(err),
            Self::Clipboard(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TrayServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TransplantError> for TrayServiceError {
    fn from(value: TransplantError) -> Self {
        Self::Transplant(value)
    }
}

impl From<ClipboardError> for TrayServiceError {
    fn from(value: ClipboardError) -> Self {
        Self::Clipboard(value)
    }
}

/// Parent and child after an edge was added.
#[derive(Debug, Clone, PartialEq)]
pub struct Attached {
    pub parent: Tray,
    pub child: Tray,
}

/// Result of loading a tray's effective children.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildrenLoad {
    /// Loaded children in effective order; missing ids are skipped.
    Fresh(Vec<Tray>),
    /// The children list changed while loading; the result was discarded.
    Stale,
}

/// Single-threaded session over one tray store.
pub struct TrayService<S: TrayStore> {
    pub(super) store: S,
    config: TrayGraphConfig,
    tags: RefCell<TagIndex>,
    generations: RefCell<ChildrenGenerations>,
}

impl<S: TrayStore> TrayService<S> {
    /// Creates a session with default configuration.
    pub fn new(store: S) -> Self {
        Self::with_config(store, TrayGraphConfig::default())
    }

    pub fn with_config(store: S, config: TrayGraphConfig) -> Self {
        Self {
            store,
            config,
            tags: RefCell::new(TagIndex::new()),
            generations: RefCell::new(ChildrenGenerations::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TrayGraphConfig {
        &self.config
    }

    /// Ids carrying `tag` among trays observed this session.
    pub fn tagged_ids(&self, tag: &str) -> Vec<TrayId> {
        self.tags.borrow().ids_for(tag)
    }

    /// Current children generation of `id`.
    pub fn children_generation(&self, id: &str) -> u64 {
        self.generations.borrow().current(id)
    }

    /// Loads one tray and records it in the session index.
    ///
    /// A watcher whose implicit children are out of date is refreshed and
    /// persisted before being returned.
    pub async fn load_tray(&self, id: &str) -> ServiceResult<Option<Tray>> {
        let Some(mut tray) = self.store.load_tray(id).await? else {
            return Ok(None);
        };
        if self.aggregate(&mut tray) {
            self.store.save_tray(&tray).await?;
        }
        let change = self.observe(&tray);
        if !change.is_empty() {
            if let Err(err) = self.refresh_watchers(&change, Some(&tray.id)).await {
                warn!("event=watch_refresh module=service status=error error={err}");
            }
        }
        Ok(Some(tray))
    }

    /// Like [`Self::load_tray`] but a missing tray is an error.
    pub async fn get_tray(&self, id: &str) -> ServiceResult<Tray> {
        self.load_tray(id)
            .await?
            .ok_or_else(|| TrayServiceError::TrayNotFound(id.to_string()))
    }

    /// Persists `tray` and reconciles session state.
    ///
    /// The tray's own implicit children are recomputed before writing; then
    /// watchers of any tag the save added or removed are refreshed. Returns
    /// the tray as written.
    pub async fn save_tray(&self, tray: &Tray) -> ServiceResult<Tray> {
        let mut tray = tray.clone();
        self.aggregate(&mut tray);
        self.store.save_tray(&tray).await?;
        let change = self.observe(&tray);
        self.refresh_watchers(&change, Some(&tray.id)).await?;
        Ok(tray)
    }

    /// Loads the configured root, creating and saving it on first use.
    pub async fn open_root(&self) -> ServiceResult<Tray> {
        if let Some(root) = self.load_tray(&self.config.root_tray_id).await? {
            return Ok(root);
        }
        let mut root = Tray::with_id(
            self.config.root_tray_id.clone(),
            self.config.root_tray_name.clone(),
        );
        root.layout_axis = self.config.default_layout_axis;
        info!("event=root_create module=service status=ok");
        self.save_tray(&root).await
    }

    /// Creates an empty child in edit mode at the top of `parent_id`.
    pub async fn add_child(&self, parent_id: &str) -> ServiceResult<Attached> {
        let mut parent = self.get_tray(parent_id).await?;
        let mut child = Tray::new("");
        child.layout_axis = self.config.default_layout_axis;
        child.editing_start = true;
        child.add_parent(&parent.id);

        parent.prepend_child(&child.id);
        parent.folded = false;
        parent.touch();

        // Child first: an interrupted pair is then recoverable by repair.
        let child = self.save_tray(&child).await?;
        let parent = self.save_tray(&parent).await?;
        Ok(Attached { parent, child })
    }

    /// Sets the display name and leaves edit mode.
    pub async fn rename(&self, id: &str, name: &str) -> ServiceResult<Tray> {
        self.update(id, |tray| {
            tray.name = name.to_string();
            tray.editing_start = false;
        })
        .await
    }

    pub async fn set_tags<I, T>(&self, id: &str, tags: I) -> ServiceResult<Tray>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags = normalize_tags(tags);
        self.update(id, move |tray| tray.tags = tags).await
    }

    /// Replaces tags from comma separated input such as `"work, home"`.
    pub async fn set_tags_from_input(&self, id: &str, input: &str) -> ServiceResult<Tray> {
        self.set_tags(id, parse_tag_input(input)).await
    }

    pub async fn set_watch_tags<I, T>(&self, id: &str, tags: I) -> ServiceResult<Tray>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let tags = normalize_tags(tags);
        self.update(id, move |tray| tray.watch_tags = tags).await
    }

    pub async fn set_watch_tags_from_input(&self, id: &str, input: &str) -> ServiceResult<Tray> {
        self.set_watch_tags(id, parse_tag_input(input)).await
    }

    pub async fn toggle_fold(&self, id: &str) -> ServiceResult<Tray> {
        self.update(id, |tray| tray.folded = !tray.folded).await
    }

    pub async fn set_folded(&self, id: &str, folded: bool) -> ServiceResult<Tray> {
        self.update(id, |tray| tray.folded = folded).await
    }

    pub async fn toggle_layout_axis(&self, id: &str) -> ServiceResult<Tray> {
        self.update(id, |tray| tray.layout_axis = tray.layout_axis.toggled())
            .await
    }

    pub async fn set_metadata_entry(
        &self,
        id: &str,
        key: &str,
        value: Value,
    ) -> ServiceResult<Tray> {
        self.update(id, |tray| {
            tray.metadata.insert(key.to_string(), value);
        })
        .await
    }

    /// Removes the edge between `parent_id` and `child_id` in both directions.
    ///
    /// The child is orphaned, never deleted. A missing child only updates the
    /// parent. A child that also matches a watch tag stays an implicit child.
    pub async fn unlink(&self, parent_id: &str, child_id: &str) -> ServiceResult<Tray> {
        let mut parent = self.get_tray(parent_id).await?;
        if parent.remove_child(child_id) {
            parent.touch();
            parent = self.save_tray(&parent).await?;
        }
        if let Some(mut child) = self.load_tray(child_id).await? {
            if child.remove_parent(parent_id) {
                child.touch();
                self.save_tray(&child).await?;
            }
        }
        debug!("event=tray_unlink module=service status=ok");
        Ok(parent)
    }

    /// Adds an existing tray as a further child of `parent_id`.
    pub async fn link_existing(&self, parent_id: &str, child_id: &str) -> ServiceResult<Attached> {
        if parent_id == child_id {
            return Err(TrayServiceError::SelfLink(child_id.to_string()));
        }
        let mut parent = self.get_tray(parent_id).await?;
        let mut child = self.get_tray(child_id).await?;

        if child.add_parent(&parent.id) {
            child.touch();
            child = self.save_tray(&child).await?;
        }
        if parent.push_child(&child.id) {
            parent.touch();
            parent = self.save_tray(&parent).await?;
        }
        Ok(Attached { parent, child })
    }

    /// Runs consistency repair from `id` over its subtree.
    pub async fn repair(&self, id: &str) -> ServiceResult<RepairReport> {
        let tray = self.get_tray(id).await?;
        Ok(repair_subtree(&self.store, &tray).await?)
    }

    /// Explicit followed by implicit children of `id`.
    pub async fn effective_children(&self, id: &str) -> ServiceResult<Vec<TrayId>> {
        Ok(self.get_tray(id).await?.effective_children())
    }

    /// Loads the effective children of `tray` concurrently.
    ///
    /// Returns [`ChildrenLoad::Stale`] when the tray's children changed in
    /// this session while the loads were in flight.
    pub async fn load_children(&self, tray: &Tray) -> ServiceResult<ChildrenLoad> {
        let ticket = self.generations.borrow_mut().observe(tray);
        let ids = tray.effective_children();
        let loaded = load_many(&self.store, &ids, "service").await;

        if self.generations.borrow().current(&tray.id) != ticket {
            debug!("event=children_load module=service status=skip reason=stale");
            return Ok(ChildrenLoad::Stale);
        }

        let children: Vec<Tray> = loaded.into_iter().filter_map(|(_, tray)| tray).collect();
        let mut touched = TagChange::default();
        for child in &children {
            let change = self.observe(child);
            touched.added.extend(change.added);
            touched.removed.extend(change.removed);
        }
        if !touched.is_empty() {
            if let Err(err) = self.refresh_watchers(&touched, Some(&tray.id)).await {
                warn!("event=watch_refresh module=service status=error error={err}");
            }
        }
        Ok(ChildrenLoad::Fresh(children))
    }

    /// Computes the focus move without side effects.
    pub async fn move_focus(&self, path: &FocusPath, direction: FocusDirection) -> FocusOutcome {
        move_focus(&self.store, path, direction).await
    }

    /// Moves focus, unfolding the focused tray first when descending requires it.
    pub async fn move_focus_unfolding(
        &self,
        path: &FocusPath,
        direction: FocusDirection,
    ) -> ServiceResult<FocusPath> {
        match self.move_focus(path, direction).await {
            FocusOutcome::NeedsUnfold => {
                if let Some(current) = path.current() {
                    self.set_folded(current, false).await?;
                }
                Ok(self.move_focus(path, direction).await.resolve(path))
            }
            outcome => Ok(outcome.resolve(path)),
        }
    }

    async fn update(&self, id: &str, mutate: impl FnOnce(&mut Tray)) -> ServiceResult<Tray> {
        let mut tray = self.get_tray(id).await?;
        mutate(&mut tray);
        tray.touch();
        self.save_tray(&tray).await
    }

    /// Records tags, watch tags and children generation of `tray`.
    pub(super) fn observe(&self, tray: &Tray) -> TagChange {
        self.generations.borrow_mut().observe(tray);
        self.tags.borrow_mut().observe(tray)
    }

    /// Recomputes `tray.watched` against the current index.
    pub(super) fn aggregate(&self, tray: &mut Tray) -> bool {
        let index = self.tags.borrow();
        apply_watch_aggregation(tray, &index)
    }

    /// Refreshes and persists every watcher of a tag in `change`, except `skip`.
    pub(super) async fn refresh_watchers(
        &self,
        change: &TagChange,
        skip: Option<&str>,
    ) -> ServiceResult<usize> {
        let watchers: BTreeSet<TrayId> = {
            let index = self.tags.borrow();
            change
                .touched()
                .flat_map(|tag| index.watchers_of(tag))
                .filter(|id| Some(id.as_str()) != skip)
                .collect()
        };

        let mut refreshed = 0;
        for id in watchers {
            let Some(mut watcher) = self.store.load_tray(&id).await? else {
                continue;
            };
            if self.aggregate(&mut watcher) {
                self.store.save_tray(&watcher).await?;
                self.observe(&watcher);
                refreshed += 1;
            }
        }
        if refreshed > 0 {
            debug!(
                "event=watch_refresh module=service status=ok refreshed={}",
                refreshed
            );
        }
        Ok(refreshed)
    }
}

impl<S: TrayScan> TrayService<S> {
    /// Clears the session tag index and re-observes every stored tray.
    ///
    /// Returns the number of trays observed.
    pub async fn rebuild_tag_index(&self) -> ServiceResult<usize> {
        let ids = self.store.list_tray_ids().await?;
        self.tags.borrow_mut().clear();

        let mut observed = 0;
        for (_, tray) in load_many(&self.store, &ids, "service").await {
            if let Some(tray) = tray {
                self.observe(&tray);
                observed += 1;
            }
        }
        info!(
            "event=tag_index_rebuild module=service status=ok observed={}",
            observed
        );
        Ok(observed)
    }
}
