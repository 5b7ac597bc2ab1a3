//! Clipboard copy and paste over a tray session.
//!
//! # Responsibility
//! - Serialize subtrees, single trays and markdown outlines to the clipboard.
//! - Paste clipboard contents under a destination and reconcile session state.
//!
//! # Invariants
//! - Copy never writes to the store.
//! - After a paste, every written tray is observed and affected watchers
//!   are refreshed.

use crate::clipboard::Clipboard;
use crate::graph::tag_index::TagChange;
use crate::graph::transplant::{transplant_copy, transplant_reference, TransplantOutcome};
use crate::graph::traversal::{export_subtree, subtree_to_json};
use crate::model::tray::Tray;
use crate::outline::markdown::{outline_roots, parse_markdown_outline, render_markdown_outline};
use crate::repo::tray_store::TrayStore;
use crate::service::tray_service::{ServiceResult, TrayService, TrayServiceError};
use log::info;

impl<S: TrayStore> TrayService<S> {
    /// Writes the subtree under `id` as a JSON array. Returns the tray count.
    pub async fn copy_subtree<C: Clipboard + ?Sized>(
        &self,
        id: &str,
        clipboard: &C,
    ) -> ServiceResult<usize> {
        let trays = export_subtree(&self.store, id).await;
        if trays.is_empty() {
            return Err(TrayServiceError::TrayNotFound(id.to_string()));
        }
        let payload =
            subtree_to_json(&trays).map_err(|err| TrayServiceError::Serialize(err.to_string()))?;
        clipboard.write_text(&payload).await?;
        info!(
            "event=subtree_copy module=service status=ok count={}",
            trays.len()
        );
        Ok(trays.len())
    }

    /// Writes the single tray `id` as a JSON object, without descendants.
    pub async fn copy_tray<C: Clipboard + ?Sized>(
        &self,
        id: &str,
        clipboard: &C,
    ) -> ServiceResult<Tray> {
        let tray = self.get_tray(id).await?;
        let payload = serde_json::to_string(&tray)
            .map_err(|err| TrayServiceError::Serialize(err.to_string()))?;
        clipboard.write_text(&payload).await?;
        Ok(tray)
    }

    /// Pastes a fresh-id copy of the clipboard subtree under `destination_id`.
    pub async fn paste_subtree<C: Clipboard + ?Sized>(
        &self,
        destination_id: &str,
        clipboard: &C,
    ) -> ServiceResult<TransplantOutcome> {
        let destination = self.get_tray(destination_id).await?;
        let payload = clipboard.read_text().await?;
        let mut outcome = transplant_copy(&self.store, &payload, &destination).await?;
        outcome.destination = self.settle(&outcome.written, outcome.destination).await?;
        Ok(outcome)
    }

    /// Links the single clipboard tray under `destination_id` keeping its id.
    pub async fn paste_reference<C: Clipboard + ?Sized>(
        &self,
        destination_id: &str,
        clipboard: &C,
    ) -> ServiceResult<TransplantOutcome> {
        let destination = self.get_tray(destination_id).await?;
        let payload = clipboard.read_text().await?;
        let mut outcome = transplant_reference(&self.store, &payload, &destination).await?;
        outcome.destination = self.settle(&outcome.written, outcome.destination).await?;
        Ok(outcome)
    }

    /// Writes the subtree under `id` as a dash-indented outline.
    pub async fn copy_markdown<C: Clipboard + ?Sized>(
        &self,
        id: &str,
        clipboard: &C,
    ) -> ServiceResult<String> {
        let outline = render_markdown_outline(&self.store, id).await;
        if outline.is_empty() {
            return Err(TrayServiceError::TrayNotFound(id.to_string()));
        }
        clipboard.write_text(&outline).await?;
        Ok(outline)
    }

    /// Imports the clipboard outline under `destination_id`.
    pub async fn paste_markdown<C: Clipboard + ?Sized>(
        &self,
        destination_id: &str,
        clipboard: &C,
    ) -> ServiceResult<Vec<Tray>> {
        let text = clipboard.read_text().await?;
        self.import_markdown(destination_id, &text).await
    }

    /// Creates trays for `text` and attaches its top-level items under
    /// `destination_id`, ahead of existing children and in document order.
    ///
    /// Text without outline items writes nothing.
    pub async fn import_markdown(
        &self,
        destination_id: &str,
        text: &str,
    ) -> ServiceResult<Vec<Tray>> {
        let mut trays = parse_markdown_outline(text);
        if trays.is_empty() {
            return Ok(trays);
        }
        let mut destination = self.get_tray(destination_id).await?;
        let roots = outline_roots(&trays);
        for tray in trays.iter_mut().filter(|tray| roots.contains(&tray.id)) {
            tray.add_parent(&destination.id);
        }
        for root in roots.iter().rev() {
            destination.prepend_child(root);
        }
        destination.folded = false;
        destination.touch();

        for tray in &trays {
            self.store.save_tray(tray).await?;
        }
        self.store.save_tray(&destination).await?;
        self.settle(&trays, destination).await?;
        info!(
            "event=outline_import module=service status=ok count={}",
            trays.len()
        );
        Ok(trays)
    }

    /// Observes trays written by a paste and refreshes dependent watchers.
    ///
    /// The destination gained explicit children, so its implicit list is
    /// recomputed and written again only if that changed it.
    async fn settle(&self, written: &[Tray], mut destination: Tray) -> ServiceResult<Tray> {
        let mut touched = TagChange::default();
        for tray in written {
            let change = self.observe(tray);
            touched.added.extend(change.added);
            touched.removed.extend(change.removed);
        }
        if self.aggregate(&mut destination) {
            self.store.save_tray(&destination).await?;
        }
        let change = self.observe(&destination);
        touched.added.extend(change.added);
        touched.removed.extend(change.removed);
        self.refresh_watchers(&touched, Some(&destination.id)).await?;
        Ok(destination)
    }
}
